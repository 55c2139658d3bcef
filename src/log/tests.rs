use super::*;
use std::sync::{Arc, Mutex};

#[test]
fn test_level_ordering() {
    assert!(Level::Error > Level::Warn);
    assert!(Level::Warn > Level::Info);
    assert!(Level::Info > Level::Verbose);
    assert!(!Level::Silent.is_enabled());
    assert_eq!(Level::try_from(3u8).ok(), Some(Level::Warn));
    assert!(Level::try_from(9u8).is_err());
}

#[test]
fn test_record_formatting() {
    let record = Record {
        level: Level::Warn,
        channel: Some(channel!("viewport")),
        location: Location { file: "a.rs", line: 1, module: "a" },
        message: "out of slots".into(),
    };
    assert_eq!(record.to_string(), "[Warn] [viewport] - out of slots");

    let record = Record { channel: None, ..record };
    assert_eq!(record.to_string(), "[Warn] - out of slots");
}

#[test]
fn test_listener_sees_records() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    // Other tests log concurrently, so only look at this channel.
    assert!(set_listener(move |record| {
        if record.channel == Some(channel!("listener-test")) {
            sink.lock().unwrap().push(record.message.clone());
        }
    }));
    assert!(!set_listener(|_| {}));

    error!(channel!("listener-test"), "lost {} viewports", 2);
    assert_eq!(*seen.lock().unwrap(), ["lost 2 viewports"]);
}
