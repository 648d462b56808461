//! In-process repositories selected by a `memory://` database URL.
//!
//! Records live for the lifetime of the process. Ids are assigned from a
//! counter starting at 1, like a `BIGSERIAL` column.

mod storage;
mod upload_task;

pub use storage::MemoryStorageRepository;
pub use upload_task::MemoryUploadTaskRepository;
