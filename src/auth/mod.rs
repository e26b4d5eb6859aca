/// 凭据模块 - OAuth2 授权、刷新与持久化
pub mod oauth;
pub mod token;
pub mod types;

pub use token::TokenManager;
pub use types::Credential;
