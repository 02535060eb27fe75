/// Asserts that the next item of a log stream equals `$expected`.
///
/// Waits at most `timeout` seconds (default 5).
macro_rules! assert_next {
    ($stream: expr, $expected: expr) => {
        assert_next!($stream, $expected, timeout = 5)
    };
    ($stream: expr, $expected: expr, timeout = $secs: expr) => {
        let message = tokio::time::timeout(
            std::time::Duration::from_secs($secs),
            tokio_stream::StreamExt::next(&mut $stream),
        )
        .await
        .expect("timed out");
        let expected = $expected;
        match message {
            std::option::Option::Some(log) => {
                assert_eq!(log, expected, "Expected {:?}, got {:?}", expected, log);
            }
            std::option::Option::None => {
                panic!("Expected {:?}, but stream was closed", expected);
            }
        }
    };
}

/// Asserts that a log stream ends within `timeout` seconds (default 5).
macro_rules! assert_closed {
    ($stream: expr) => {
        assert_closed!($stream, timeout = 5)
    };
    ($stream: expr, timeout = $secs: expr) => {
        let message = tokio::time::timeout(
            std::time::Duration::from_secs($secs),
            tokio_stream::StreamExt::next(&mut $stream),
        )
        .await
        .expect("timed out");
        assert!(message.is_none(), "Expected closed stream, got {:?}", message)
    };
}

/// Asserts that a [`ReceiverStream`](tokio_stream::wrappers::ReceiverStream) has nothing pending,
/// and hands the stream back.
macro_rules! assert_empty {
    ($stream: expr) => {{
        let inner = $stream.into_inner();
        assert!(inner.is_empty(), "Stream should have no pending logs");
        tokio_stream::wrappers::ReceiverStream::new(inner)
    }};
}
