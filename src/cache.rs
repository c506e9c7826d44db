use crate::config::CacheConfig;
use crate::connections::Unavailable;
use crate::error::ApiError;
use anyhow::Context;
use redis::aio::MultiplexedConnection;
use redis::{
    AsyncCommands, AsyncConnectionConfig, Client, ConnectionAddr, ConnectionInfo,
    RedisConnectionInfo, RedisResult,
};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

/// Redis 上のカウンタキー。プロセスの外で保持されるので再起動しても値は残る。
pub const COUNTER_KEY: &str = "api_counter";

/// Redis への接続を 1 本だけ memoize して使い回すラッパー。
/// `MultiplexedConnection` は `Clone` で複数リクエストから同時に使えるため、
/// ロックは差し替えの瞬間だけ取ればよい。
pub struct Cache {
    client: Client,
    handle: RwLock<Option<MultiplexedConnection>>,
    connection_config: AsyncConnectionConfig,
}

impl Cache {
    /// `Client::open` は接続情報の検証だけを行い、実際の接続は `acquire` まで遅延される。
    pub fn new(config: &CacheConfig) -> anyhow::Result<Self> {
        info!("Configuring Redis client for host: {}:{}", config.host, config.port);

        let mut redis_info = RedisConnectionInfo::default();
        redis_info.password = config.password.clone();

        let info = ConnectionInfo {
            addr: ConnectionAddr::Tcp(config.host.clone(), config.port),
            redis: redis_info,
        };

        let client = Client::open(info).context("Invalid Redis connection parameters")?;

        Ok(Cache {
            client,
            handle: RwLock::new(None),
            connection_config: AsyncConnectionConfig::new()
                .set_connection_timeout(config.timeout)
                .set_response_timeout(config.timeout),
        })
    }

    /// 既存の接続があれば PING で生存確認し、失敗したら破棄して 1 回だけ張り直す。
    /// 張り直しも失敗した場合は `Unavailable::Cache` を返し、それ以上リトライしない。
    pub async fn acquire(&self) -> Result<MultiplexedConnection, Unavailable> {
        let existing = self.handle.read().await.clone();

        if let Some(mut conn) = existing {
            match ping(&mut conn).await {
                Ok(()) => return Ok(conn),
                Err(e) => {
                    warn!("Redis liveness check failed, reconnecting: {}", e);
                    self.handle.write().await.take();
                }
            }
        }

        match self.connect().await {
            Ok(conn) => {
                *self.handle.write().await = Some(conn.clone());
                Ok(conn)
            }
            Err(e) => {
                error!("Redis connection failed: {}", e);
                Err(Unavailable::Cache(e))
            }
        }
    }

    async fn connect(&self) -> RedisResult<MultiplexedConnection> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection_with_config(&self.connection_config)
            .await?;
        ping(&mut conn).await?;

        info!("Redis connection established");
        Ok(conn)
    }

    /// カウンタを読む。キーが無ければ 0。整数として読めない値は内部エラー扱い。
    pub async fn counter(&self) -> Result<i64, ApiError> {
        let mut conn = self.acquire().await?;

        let value: Option<String> = conn
            .get(COUNTER_KEY)
            .await
            .context("Counter retrieval failed")?;

        parse_counter(value.as_deref()).map_err(ApiError::Internal)
    }

    /// `INCR` はキーが無ければ 0 から作って 1 を返すので、初期化処理は不要。
    pub async fn increment_counter(&self) -> Result<i64, ApiError> {
        let mut conn = self.acquire().await?;

        let value: i64 = conn
            .incr(COUNTER_KEY, 1)
            .await
            .context("Counter increment failed")?;

        Ok(value)
    }
}

async fn ping(conn: &mut MultiplexedConnection) -> RedisResult<()> {
    let _pong: String = redis::cmd("PING").query_async(conn).await?;
    Ok(())
}

fn parse_counter(value: Option<&str>) -> anyhow::Result<i64> {
    match value {
        None => Ok(0),
        Some(raw) => raw
            .trim()
            .parse::<i64>()
            .with_context(|| format!("Counter value {:?} is not an integer", raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connections::tests::unreachable_config;

    #[test]
    fn test_parse_counter() {
        assert_eq!(parse_counter(None).unwrap(), 0);
        assert_eq!(parse_counter(Some("0")).unwrap(), 0);
        assert_eq!(parse_counter(Some("42")).unwrap(), 42);
        assert!(parse_counter(Some("forty-two")).is_err());
        assert!(parse_counter(Some("")).is_err());
    }

    #[tokio::test]
    async fn test_acquire_unreachable_leaves_no_handle() {
        let cache = Cache::new(&unreachable_config().cache).unwrap();

        assert!(matches!(cache.acquire().await, Err(Unavailable::Cache(_))));
        assert!(cache.handle.read().await.is_none());
    }

    #[tokio::test]
    async fn test_counter_operations_surface_unavailable() {
        let cache = Cache::new(&unreachable_config().cache).unwrap();

        assert!(matches!(cache.counter().await, Err(ApiError::Unavailable(_))));
        assert!(matches!(
            cache.increment_counter().await,
            Err(ApiError::Unavailable(_))
        ));
    }

    mod fake_redis {
        //! Minimal RESP server: answers PING with PONG, GET with a fixed
        //! reply and everything else with OK.

        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::{Arc, Mutex};
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::{TcpListener, TcpStream};
        use tokio::task::AbortHandle;

        pub struct FakeRedis {
            pub port: u16,
            accepted: Arc<AtomicUsize>,
            sessions: Arc<Mutex<Vec<AbortHandle>>>,
        }

        impl FakeRedis {
            pub async fn start(get_reply: &'static str) -> Self {
                let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
                let port = listener.local_addr().unwrap().port();
                let accepted = Arc::new(AtomicUsize::new(0));
                let sessions = Arc::new(Mutex::new(Vec::new()));

                let (counter, handles) = (accepted.clone(), sessions.clone());
                tokio::spawn(async move {
                    while let Ok((socket, _)) = listener.accept().await {
                        counter.fetch_add(1, Ordering::SeqCst);
                        let session = tokio::spawn(serve(socket, get_reply));
                        handles.lock().unwrap().push(session.abort_handle());
                    }
                });

                FakeRedis { port, accepted, sessions }
            }

            pub fn accepted(&self) -> usize {
                self.accepted.load(Ordering::SeqCst)
            }

            /// Drops every open client socket; the listener keeps accepting.
            pub fn drop_connections(&self) {
                for session in self.sessions.lock().unwrap().drain(..) {
                    session.abort();
                }
            }
        }

        async fn serve(mut socket: TcpStream, get_reply: &'static str) {
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];

            loop {
                let n = match socket.read(&mut chunk).await {
                    Ok(0) | Err(_) => return,
                    Ok(n) => n,
                };
                buf.extend_from_slice(&chunk[..n]);

                while let Some((command, used)) = parse_command(&buf) {
                    buf.drain(..used);
                    let reply = match command.first().map(|c| c.to_ascii_uppercase()) {
                        Some(ref c) if c == "PING" => "+PONG\r\n",
                        Some(ref c) if c == "GET" => get_reply,
                        _ => "+OK\r\n",
                    };
                    if socket.write_all(reply.as_bytes()).await.is_err() {
                        return;
                    }
                }
            }
        }

        fn parse_command(buf: &[u8]) -> Option<(Vec<String>, usize)> {
            let mut pos = 0;
            let count: usize = read_line(buf, &mut pos)?.strip_prefix('*')?.parse().ok()?;

            let mut args = Vec::with_capacity(count);
            for _ in 0..count {
                let len: usize = read_line(buf, &mut pos)?.strip_prefix('$')?.parse().ok()?;
                if buf.len() < pos + len + 2 {
                    return None;
                }
                args.push(String::from_utf8_lossy(&buf[pos..pos + len]).into_owned());
                pos += len + 2;
            }

            Some((args, pos))
        }

        fn read_line<'a>(buf: &'a [u8], pos: &mut usize) -> Option<&'a str> {
            let rest = buf.get(*pos..)?;
            let end = rest.windows(2).position(|w| w == b"\r\n")?;
            let line = std::str::from_utf8(&rest[..end]).ok()?;
            *pos += end + 2;
            Some(line)
        }
    }

    use fake_redis::FakeRedis;
    use std::time::Duration;

    fn local_cache(port: u16) -> Cache {
        Cache::new(&CacheConfig {
            host: "127.0.0.1".to_string(),
            port,
            password: None,
            timeout: Duration::from_secs(2),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_acquire_reuses_live_handle_and_reconnects_once_after_drop() {
        let server = FakeRedis::start("$-1\r\n").await;
        let cache = local_cache(server.port);

        assert!(cache.acquire().await.is_ok());
        assert_eq!(server.accepted(), 1);
        assert!(cache.handle.read().await.is_some());

        // PING on the memoized handle succeeds, so no new connection
        assert!(cache.acquire().await.is_ok());
        assert_eq!(server.accepted(), 1);

        server.drop_connections();
        tokio::time::sleep(Duration::from_millis(100)).await;

        // PING fails on the dead handle; it is replaced by exactly one new connection
        assert!(cache.acquire().await.is_ok());
        assert_eq!(server.accepted(), 2);

        assert!(cache.acquire().await.is_ok());
        assert_eq!(server.accepted(), 2);
    }

    #[tokio::test]
    async fn test_counter_reads_missing_key_as_zero() {
        let server = FakeRedis::start("$-1\r\n").await;
        let cache = local_cache(server.port);

        assert_eq!(cache.counter().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_malformed_counter_is_internal_and_logged_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;
        use axum::response::IntoResponse;
        use tracing::{Event, Level, Subscriber};
        use tracing_subscriber::{layer::Context as LayerContext, prelude::*, Layer};

        struct ErrorEvents(Arc<AtomicUsize>);

        impl<S: Subscriber> Layer<S> for ErrorEvents {
            fn on_event(&self, event: &Event<'_>, _ctx: LayerContext<'_, S>) {
                if *event.metadata().level() == Level::ERROR {
                    self.0.fetch_add(1, Ordering::SeqCst);
                }
            }
        }

        let errors = Arc::new(AtomicUsize::new(0));
        let _guard = tracing::subscriber::set_default(
            tracing_subscriber::registry().with(ErrorEvents(errors.clone())),
        );

        let server = FakeRedis::start("$10\r\nnot-a-num!\r\n").await;
        let cache = local_cache(server.port);

        let err = cache.counter().await.unwrap_err();
        assert!(matches!(err, ApiError::Internal(_)));

        let response = err.into_response();
        assert_eq!(response.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }
}
