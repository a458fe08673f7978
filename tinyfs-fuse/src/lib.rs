
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use tinyfs::{ByteStore, DescriptorId, TinyFs};

/// Byte store backed by an image file on the host.
pub struct HostFile(pub Mutex<File>);

impl HostFile {
    pub fn new(file: File) -> Self {
        Self(Mutex::new(file))
    }
}

impl ByteStore for HostFile {
    fn read_at(&self, offset: usize, buf: &mut [u8]) -> tinyfs::Result<()> {
        let mut file = self.0.lock().map_err(|_| tinyfs::Error::Io)?;
        file.seek(SeekFrom::Start(offset as u64))
            .and_then(|_| file.read_exact(buf))
            .map_err(host_error)
    }

    fn write_at(&self, offset: usize, buf: &[u8]) -> tinyfs::Result<()> {
        let mut file = self.0.lock().map_err(|_| tinyfs::Error::Io)?;
        file.seek(SeekFrom::Start(offset as u64))
            .and_then(|_| file.write_all(buf))
            .map_err(host_error)
    }
}

/// Creates (or overwrites) the image at `path` and formats it.
pub fn format(path: impl AsRef<Path>, descriptor_count: DescriptorId) -> io::Result<TinyFs> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    TinyFs::format(Arc::new(HostFile::new(file)), descriptor_count).map_err(into_io)
}

/// Opens an existing image. Only the descriptor count is read back.
pub fn mount(path: impl AsRef<Path>) -> io::Result<TinyFs> {
    let file = OpenOptions::new().read(true).write(true).open(path)?;
    TinyFs::mount(Arc::new(HostFile::new(file))).map_err(into_io)
}

pub fn into_io(err: tinyfs::Error) -> io::Error {
    use tinyfs::Error;

    let kind = match err {
        Error::NotFound => io::ErrorKind::NotFound,
        Error::AlreadyExists => io::ErrorKind::AlreadyExists,
        Error::NameTooLong | Error::InvalidOffset | Error::InvalidRange | Error::OutOfRange => {
            io::ErrorKind::InvalidInput
        }
        Error::OutOfSpace | Error::NoFreeDescriptor => io::ErrorKind::StorageFull,
        Error::NotADirectory => io::ErrorKind::NotADirectory,
        Error::IsADirectory => io::ErrorKind::IsADirectory,
        Error::DirectoryNotEmpty => io::ErrorKind::DirectoryNotEmpty,
        Error::InvalidLayout | Error::Codec => io::ErrorKind::InvalidData,
        _ => io::ErrorKind::Other,
    };
    io::Error::new(kind, err)
}

fn host_error(err: io::Error) -> tinyfs::Error {
    log::error!("host file: {err}");
    tinyfs::Error::Io
}
