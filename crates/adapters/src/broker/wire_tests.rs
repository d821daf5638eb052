// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn frames_survive_a_duplex_pipe() {
    let (mut client, mut server) = tokio::io::duplex(1024);

    let req = Request::Publish {
        channel: "fleet:control:_all_".to_string(),
        message: r#"{"type":"killall"}"#.to_string(),
    };
    write_frame(&mut client, &req).await.unwrap();

    let got: Request = read_frame(&mut server).await.unwrap();
    assert_eq!(got, req);
}

#[test]
fn request_json_shape() {
    let json = serde_json::to_string(&Request::NumSub {
        channel: "c".to_string(),
    })
    .unwrap();
    assert_eq!(json, r#"{"type":"num_sub","channel":"c"}"#);
}

#[tokio::test]
async fn eof_is_connection_closed() {
    let (client, mut server) = tokio::io::duplex(64);
    drop(client);
    let err = read_message(&mut server).await.unwrap_err();
    assert!(matches!(err, WireError::ConnectionClosed));
}

#[tokio::test]
async fn truncated_body_is_connection_closed() {
    let (mut client, mut server) = tokio::io::duplex(64);
    client.write_all(&10u32.to_be_bytes()).await.unwrap();
    client.write_all(b"abc").await.unwrap();
    drop(client);

    let err = read_message(&mut server).await.unwrap_err();
    assert!(matches!(err, WireError::ConnectionClosed));
}

#[tokio::test]
async fn oversized_length_prefix_is_rejected() {
    let (mut client, mut server) = tokio::io::duplex(64);
    client
        .write_all(&((MAX_MESSAGE_SIZE as u32) + 1).to_be_bytes())
        .await
        .unwrap();

    let err = read_message(&mut server).await.unwrap_err();
    assert!(matches!(err, WireError::MessageTooLarge { .. }));
}
