//! 答案编解码 - 业务能力层
//!
//! 只负责"让答案在缓存里不可直接读出"，不是加密

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::{AppError, AppResult};

/// 答案编解码器
///
/// 标准 Base64，可逆且确定。
#[derive(Debug, Clone, Copy, Default)]
pub struct AnswerCodec;

impl AnswerCodec {
    pub fn new() -> Self {
        Self
    }

    /// 编码答案标记
    pub fn encode(&self, marker: &str) -> String {
        STANDARD.encode(marker.as_bytes())
    }

    /// 解码答案令牌
    ///
    /// 非法 Base64、非 UTF-8 或空内容都返回 `CorruptToken`
    pub fn decode(&self, token: &str) -> AppResult<String> {
        let bytes = STANDARD
            .decode(token.trim())
            .map_err(|_| AppError::corrupt_token(token))?;
        let marker = String::from_utf8(bytes).map_err(|_| AppError::corrupt_token(token))?;

        if marker.trim().is_empty() {
            return Err(AppError::corrupt_token(token));
        }

        Ok(marker)
    }
}
