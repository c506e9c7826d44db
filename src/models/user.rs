use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;

/// users カラムの VARCHAR(100) に合わせた上限。
pub const MAX_FIELD_LEN: usize = 100;

/// 登録済みユーザーを表すドメインモデル。
/// `id` と `created_at` は DB 側で採番されるため、アプリ側で生成することはない。
/// `created_at` は serde により ISO-8601 (RFC 3339) 文字列としてシリアライズされる。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// ユーザー作成 API が受け取るペイロード。
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
}

/// GET /users のレスポンス。`{"users": [...]}` の形で返す。
#[derive(Debug, Serialize, Deserialize)]
pub struct UserList {
    pub users: Vec<User>,
}

impl User {
    /// `RETURNING id, name, email, created_at` の行から組み立てる。
    /// `try_get` を使うので、型が合わない行は panic ではなく `Err` になる。
    pub fn from_row(row: &Row) -> Result<Self, tokio_postgres::Error> {
        Ok(User {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl CreateUserRequest {
    /// 空欄禁止・文字数上限・メール形式を検証する。
    /// 失敗時は `Err(String)` を返し、DB 層で `ApiError::Validation` に変換される。
    pub fn validate(&self) -> Result<(), String> {
        let name = self.name.trim();
        let email = self.email.trim();

        if name.is_empty() {
            return Err("Name cannot be empty".to_string());
        }

        if name.chars().count() > MAX_FIELD_LEN {
            return Err(format!("Name cannot exceed {} characters", MAX_FIELD_LEN));
        }

        if email.is_empty() {
            return Err("Email cannot be empty".to_string());
        }

        if email.chars().count() > MAX_FIELD_LEN {
            return Err(format!("Email cannot exceed {} characters", MAX_FIELD_LEN));
        }

        if !is_valid_email(email) {
            return Err("Invalid email format".to_string());
        }

        Ok(())
    }

    /// 前後の空白を落とした `(name, email)` を返す。
    pub fn normalized(&self) -> (String, String) {
        (self.name.trim().to_string(), self.email.trim().to_string())
    }
}

/// `@` がちょうど 1 つあり、その前後が空でなく空白を含まないことだけを確認する。
fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}
