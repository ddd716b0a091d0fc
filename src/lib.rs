pub mod format;
pub mod error;
pub mod codec;
pub mod entry;
pub mod header;
pub mod file;
pub mod archive;
pub mod lookup;
pub mod crypto;
pub mod envelope;
pub mod perf;

pub use archive::{Archive, PackOptions};
pub use codec::{Codec, CodecError, GzipCodec};
pub use entry::FileEntry;
pub use envelope::Envelope;
pub use error::{Error, Result};
pub use file::ArchivedFile;
pub use format::{detect, Kind};
pub use header::Header;
pub use lookup::{find_entry, read_member_by_name, EntryIndex};
