use thiserror::Error;

/// 查词失败的分类
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("please enter a word to search")]
    EmptyQuery,

    /// 词典中不存在该词，不会重试
    #[error("no definitions found for \"{word}\"")]
    NotFound { word: String },

    /// 网络错误或非 404 的错误状态码，重试次数用尽后返回
    #[error("lookup for \"{word}\" failed after {attempts} attempts: {reason}")]
    Transient {
        word: String,
        attempts: u32,
        reason: String,
    },

    /// 最后一次尝试因超时被中止
    #[error("lookup for \"{word}\" timed out after {attempts} attempts")]
    Aborted { word: String, attempts: u32 },

    #[error("unexpected response body for \"{word}\": {reason}")]
    MalformedResponse { word: String, reason: String },
}

impl LookupError {
    /// 界面上展示的提示。找不到与网络故障使用同一条提示
    pub fn user_message(&self, query: &str) -> String {
        match self {
            LookupError::EmptyQuery => "Please enter a word to search.".to_string(),
            _ => format!(
                "Sorry, we couldn't find \"{}\". Please check your spelling and try again.",
                query
            ),
        }
    }
}
