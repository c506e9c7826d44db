use crate::config::DatabaseConfig;
use crate::connections::Unavailable;
use crate::error::ApiError;
use crate::models::user::{CreateUserRequest, User};
use anyhow::Context;
use deadpool_postgres::{Config, Object, Pool, PoolConfig, Runtime, Timeouts};
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use tracing::{error, info, warn};

/// GET /users が返す最大件数。
pub const RECENT_USERS_LIMIT: i64 = 10;

/// 既存の users テーブルは `created_at TIMESTAMP` (タイムゾーン無し) の場合がある。
/// `CREATE TABLE IF NOT EXISTS` は既存テーブルを変更しないので、
/// 読み出し側で `::timestamptz` にキャストして `DateTime<Utc>` としてデコードできるようにする。
const INSERT_USER: &str = r#"
    INSERT INTO users (name, email)
    VALUES ($1, $2)
    RETURNING id, name, email, created_at::timestamptz AS created_at
"#;

const SELECT_RECENT_USERS: &str = r#"
    SELECT id, name, email, created_at::timestamptz AS created_at
    FROM users
    ORDER BY created_at DESC
    LIMIT $1
"#;

/// PostgreSQL への接続を握るリポジトリ層。
/// Deadpool の `Pool` を内部に保持するが、既定では `max_size = 1` なので
/// 「プロセス全体で 1 本の接続を遅延生成して使い回す」動きになる。
pub struct Database {
    pool: Pool,
}

impl Database {
    /// プールを組み立てるだけで、接続はまだ張らない。
    /// 起動時に DB が落ちていてもプロセスは立ち上がり、各リクエストが個別に 503 を返す。
    pub fn new(config: &DatabaseConfig) -> anyhow::Result<Self> {
        info!("Configuring PostgreSQL connection pool for host: {}:{}", config.host, config.port);

        let pool = Self::create_pool(config)?;
        Ok(Database { pool })
    }

    /// Deadpool 用の `Config` を組み立ててプールを生成する内部関数。
    /// `RecyclingMethod::Fast` は再利用前に `is_closed()` だけを確認する軽量な生存確認。
    fn create_pool(config: &DatabaseConfig) -> anyhow::Result<Pool> {
        let mut pg_config = Config::new();

        // Set connection parameters
        pg_config.host = Some(config.host.clone());
        pg_config.port = Some(config.port);
        pg_config.dbname = Some(config.database.clone());
        pg_config.user = Some(config.username.clone());
        pg_config.password = Some(config.password.clone());
        pg_config.connect_timeout = Some(config.timeout);

        // Configure SSL mode
        pg_config.ssl_mode = Some(match config.ssl_mode.as_str() {
            "disable" => deadpool_postgres::SslMode::Disable,
            "require" => deadpool_postgres::SslMode::Require,
            _ => deadpool_postgres::SslMode::Prefer,
        });

        pg_config.manager = Some(deadpool_postgres::ManagerConfig {
            recycling_method: deadpool_postgres::RecyclingMethod::Fast,
        });

        let mut pool_config = PoolConfig::new(config.max_connections);
        let mut timeouts = Timeouts::default();
        timeouts.wait = Some(config.timeout);
        timeouts.create = Some(config.timeout);
        timeouts.recycle = Some(config.timeout);
        pool_config.timeouts = timeouts;
        pg_config.pool = Some(pool_config);

        let tls_connector = TlsConnector::builder()
            .build()
            .context("Failed to create TLS connector")?;
        let tls = MakeTlsConnector::new(tls_connector);

        pg_config
            .create_pool(Some(Runtime::Tokio1), tls)
            .context("Failed to create PostgreSQL connection pool")
    }

    /// プールから接続を借りる。閉じた接続は破棄されて 1 回だけ作り直され、
    /// それでも失敗すれば `Unavailable::Database` になる。
    pub async fn acquire(&self) -> Result<Object, Unavailable> {
        self.pool.get().await.map_err(|e| {
            error!("PostgreSQL connection failed: {}", e);
            Unavailable::Database(e)
        })
    }

    /// 起動時に users テーブルを CREATE IF NOT EXISTS で用意する簡易マイグレーター。
    pub async fn migrate(&self) -> Result<(), ApiError> {
        info!("Running database migrations");

        let client = self.acquire().await?;

        let users_table = r#"
            CREATE TABLE IF NOT EXISTS users (
                id SERIAL PRIMARY KEY,
                name VARCHAR(100) NOT NULL,
                email VARCHAR(100) UNIQUE NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
        "#;

        client.execute(users_table, &[])
            .await
            .context("Failed to create users table")?;

        let users_created_index = "CREATE INDEX IF NOT EXISTS idx_users_created_at ON users(created_at DESC)";
        client.execute(users_created_index, &[])
            .await
            .context("Failed to create users created_at index")?;

        info!("Database table initialized successfully");
        Ok(())
    }

    // User repository operations

    /// ユーザー作成ロジック。
    /// 入力検証は接続を借りる前に行い、INSERT は明示的なトランザクションの中で実行する。
    /// 失敗時は必ず ROLLBACK してからエラーを返す。
    pub async fn create_user(&self, request: CreateUserRequest) -> Result<User, ApiError> {
        request.validate().map_err(ApiError::Validation)?;
        let (name, email) = request.normalized();

        let mut client = self.acquire().await?;
        let pg: &mut tokio_postgres::Client = &mut client;
        let transaction = pg.transaction().await?;

        let inserted = transaction
            .query_one(INSERT_USER, &[&name, &email])
            .await
            .and_then(|row| User::from_row(&row));

        match inserted {
            Ok(user) => {
                transaction.commit().await?;
                info!("Created user with id: {}", user.id);
                Ok(user)
            }
            Err(e) => {
                if let Err(rollback_err) = transaction.rollback().await {
                    warn!("Rollback after failed user creation also failed: {}", rollback_err);
                }
                Err(ApiError::from(e))
            }
        }
    }

    /// 作成日時の新しい順に最大 `RECENT_USERS_LIMIT` 件を返す。
    pub async fn recent_users(&self) -> Result<Vec<User>, ApiError> {
        let client = self.acquire().await?;

        let rows = client.query(SELECT_RECENT_USERS, &[&RECENT_USERS_LIMIT]).await?;

        let users = rows
            .iter()
            .map(User::from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(users)
    }
}
