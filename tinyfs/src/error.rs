use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// 名字解析失败
    NotFound,
    AlreadyExists,
    /// 打开文件表中没有该句柄
    NotOpen,
    /// 位图中没有空闲块
    OutOfSpace,
    /// 描述符表已满
    NoFreeDescriptor,
    /// 描述符或块编号越界
    OutOfRange,
    /// 索引块内的偏移超出容量
    InvalidOffset,
    /// 读取范围超出文件大小
    InvalidRange,
    /// 写入范围超出文件大小，需先 truncate
    FileTooSmall,
    NotADirectory,
    IsADirectory,
    DirectoryNotEmpty,
    NameTooLong,
    TooManyLinks,
    /// 内部不变量被破坏
    InvalidLayout,
    /// 字节存储读写失败
    Io,
    /// 记录编解码失败
    Codec,
}

pub type Result<T> = core::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::NotFound => "no such file or directory",
            Self::AlreadyExists => "file exists",
            Self::NotOpen => "bad file descriptor",
            Self::OutOfSpace => "no space left in block bitmap",
            Self::NoFreeDescriptor => "descriptor table is full",
            Self::OutOfRange => "index out of range",
            Self::InvalidOffset => "offset beyond file map capacity",
            Self::InvalidRange => "read range exceeds file size",
            Self::FileTooSmall => "write range exceeds file size",
            Self::NotADirectory => "not a directory",
            Self::IsADirectory => "is a directory",
            Self::DirectoryNotEmpty => "directory not empty",
            Self::NameTooLong => "invalid file name length",
            Self::TooManyLinks => "too many links",
            Self::InvalidLayout => "inconsistent on-disk layout",
            Self::Io => "byte store i/o failure",
            Self::Codec => "malformed on-disk record",
        };
        f.write_str(msg)
    }
}

impl core::error::Error for Error {}

impl From<binrw::Error> for Error {
    fn from(err: binrw::Error) -> Self {
        log::error!("record codec: {err}");
        Self::Codec
    }
}
