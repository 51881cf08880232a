use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 记录路径错误
    #[error("路径错误: {0}")]
    Path(#[from] PathError),
    /// API 调用错误
    #[error("API错误: {0}")]
    Api(#[from] ApiError),
    /// 分析任务错误
    #[error("分析错误: {0}")]
    Analysis(#[from] AnalysisError),
    /// 上传队列错误
    #[error("上传错误: {0}")]
    Upload(#[from] UploadError),
    /// 会话存储错误
    #[error("会话错误: {0}")]
    Session(#[from] SessionError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// 记录路径错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    /// 路径无效（空路径、越界索引、类型不匹配）
    #[error("无效路径 {path}: {reason}")]
    InvalidPath { path: String, reason: String },
    /// 路径文本解析失败
    #[error("无法解析路径: '{0}'")]
    Unparsable(String),
}

/// API 调用错误
#[derive(Debug, Error)]
pub enum ApiError {
    /// 网络请求失败
    #[error("网络请求失败 ({endpoint}): {source}")]
    NetworkFailure {
        endpoint: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// API 返回错误响应
    #[error("API返回错误响应 ({endpoint}): status={status}, body={body}")]
    BadResponse {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// JSON 解析失败
    #[error("JSON解析失败: {source}")]
    JsonParseFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// 分析任务错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnalysisError {
    /// 轮询次数耗尽仍未到达终态
    #[error("分析任务 {job_id} 轮询超时 (已尝试 {attempts} 次)")]
    Timeout { job_id: String, attempts: u64 },
    /// 服务端报告任务失败
    #[error("分析任务 {job_id} 失败")]
    Failed { job_id: String },
    /// 调用方取消
    #[error("分析任务 {job_id} 已取消")]
    Cancelled { job_id: String },
}

/// 上传队列错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadError {
    /// 文件不在队列中
    #[error("队列中不存在文件: {id}")]
    UnknownFile { id: String },
    /// 非法的状态迁移
    #[error("文件 {id} 不能从 {from} 迁移到 {to}")]
    InvalidTransition { id: String, from: String, to: String },
    /// 没有可上传的文件
    #[error("没有待上传的文件")]
    NothingToUpload,
    /// 本地文件读取失败
    #[error("无法读取文件 {path}: {reason}")]
    FileReadFailed { path: String, reason: String },
}

/// 会话存储错误
#[derive(Debug, Error)]
pub enum SessionError {
    /// 读取存储失败
    #[error("读取会话存储失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 写入存储失败
    #[error("写入会话存储失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 配置文件读取失败
    #[error("无法读取配置文件 {path}: {source}")]
    FileReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 配置文件解析失败
    #[error("无法解析配置文件 {path}: {source}")]
    FileParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

// ========== 从常见错误类型转换 ==========

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        let endpoint = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_default();
        if err.is_decode() {
            AppError::Api(ApiError::JsonParseFailed {
                source: Box::new(err),
            })
        } else {
            AppError::Api(ApiError::NetworkFailure {
                endpoint,
                source: Box::new(err),
            })
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Api(ApiError::JsonParseFailed {
            source: Box::new(err),
        })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Other(err.to_string())
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建无效路径错误
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Path(PathError::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        })
    }

    /// 创建网络请求失败错误
    pub fn network_failure(
        endpoint: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Api(ApiError::NetworkFailure {
            endpoint: endpoint.into(),
            source: Box::new(source),
        })
    }

    /// 创建错误响应错误
    pub fn bad_response(endpoint: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        AppError::Api(ApiError::BadResponse {
            endpoint: endpoint.into(),
            status,
            body: body.into(),
        })
    }

    /// 是否为网络层错误（包括错误响应）
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            AppError::Api(ApiError::NetworkFailure { .. }) | AppError::Api(ApiError::BadResponse { .. })
        )
    }

    /// 是否为轮询超时
    pub fn is_timeout(&self) -> bool {
        matches!(self, AppError::Analysis(AnalysisError::Timeout { .. }))
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
