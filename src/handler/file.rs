use generic_array::{
    typenum::{U1024, U16},
    ArrayLength,
};

use super::KommandHandler;
use crate::{
    kommand::{
        well_known::{FileChunk, FileError, FileErrorCode},
        Kommand, KommandReader, KommandWriter, HEADER_LEN,
    },
    serial::FrameSink,
    KommandId,
};

type ReadReplyLen = U1024;

/// Largest amount of file data sent back in one `FileReadReply`.
pub const MAX_READ_CHUNK: usize = 1024 - HEADER_LEN - 12;

/// Random access to files on the gateway's storage (the SD card).
pub trait FileStore {
    /// Read up to `buf.len()` bytes at `offset`. Fewer bytes, possibly none,
    /// are returned at the end of the file. Counts past `buf.len()` are
    /// treated as `buf.len()`.
    fn read_at(
        &mut self,
        path: &str,
        offset: u32,
        buf: &mut [u8],
    ) -> Result<usize, FileErrorCode>;

    /// Write `data` at `offset`, creating the file if needed.
    fn write_at(
        &mut self,
        path: &str,
        offset: u32,
        data: &[u8],
    ) -> Result<usize, FileErrorCode>;
}

/// Serves `FileRead` and `FileWrite` requests from a [`FileStore`].
///
/// Every request is answered, either with its reply or with a `FileError`
/// carrying the request id (0 if even that was missing).
pub struct FileHandler<F> {
    store: F,
}

impl<F: FileStore> FileHandler<F> {
    pub fn new(store: F) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &F {
        &self.store
    }

    pub fn into_inner(self) -> F {
        self.store
    }

    fn read(
        &mut self,
        kommand: &mut KommandReader<'_>,
    ) -> Result<KommandWriter<ReadReplyLen>, FileErrorCode> {
        let request = FileChunk::read_from(kommand).map_err(|_| FileErrorCode::InvalidRequest)?;
        let path = kommand.read_cstr().ok_or(FileErrorCode::InvalidRequest)?;

        let mut buf = [0u8; MAX_READ_CHUNK];
        let len = (request.size as usize).min(MAX_READ_CHUNK);
        let read = self
            .store
            .read_at(path, request.offset, &mut buf[..len])?
            .min(len);

        let mut writer = KommandWriter::new(KommandId::FileReadReply);
        FileChunk {
            size: read as u32,
            ..request
        }
        .append_to(&mut writer);
        writer.append_bytes(&buf[..read]);
        Ok(writer)
    }

    fn write(
        &mut self,
        kommand: &mut KommandReader<'_>,
    ) -> Result<KommandWriter<U16>, FileErrorCode> {
        let request = FileChunk::read_from(kommand).map_err(|_| FileErrorCode::InvalidRequest)?;
        let path = kommand.read_cstr().ok_or(FileErrorCode::InvalidRequest)?;

        if kommand.remaining() != request.size as usize {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "file write declares {} bytes but carries {}",
                request.size,
                kommand.remaining()
            );
            return Err(FileErrorCode::InvalidSize);
        }

        let written = self.store.write_at(path, request.offset, kommand.rest())?;

        let mut writer = KommandWriter::new(KommandId::FileWriteReply);
        FileChunk {
            size: written as u32,
            ..request
        }
        .append_to(&mut writer);
        Ok(writer)
    }
}

impl<F: FileStore> KommandHandler for FileHandler<F> {
    fn try_handle(&mut self, mut kommand: KommandReader<'_>, reply: &mut dyn FrameSink) -> bool {
        let request_id = kommand.clone().read_u32();

        match kommand.kommand_id() {
            Some(KommandId::FileRead) => {
                let result = self.read(&mut kommand);
                send_or_error(result, request_id, reply);
            }
            Some(KommandId::FileWrite) => {
                let result = self.write(&mut kommand);
                send_or_error(result, request_id, reply);
            }
            _ => return false,
        }

        true
    }
}

fn send_or_error<N: ArrayLength>(
    result: Result<KommandWriter<N>, FileErrorCode>,
    request_id: u32,
    reply: &mut dyn FrameSink,
) {
    match result {
        Ok(writer) => writer.send(reply),
        Err(code) => {
            #[cfg(feature = "defmt")]
            defmt::debug!("file request {} failed: {}", request_id, code);

            FileError { request_id, code }.to_writer().send(reply);
        }
    }
}
