//! Parallel input compression.
//!
//! [`compress_inputs`] reads and compresses each input on its own task.
//! Tasks share nothing but the codec (which is `Sync`); each owns the bytes
//! it read. Every task reports `(index, result)` and the results are slotted
//! back into input order, so completion order never leaks into the archive.
//!
//! With the `parallel` feature the tasks run on Rayon's global pool.
//! Without it they run sequentially on the calling thread; the output is
//! identical either way.

use std::io;

use crate::codec::Codec;
use crate::error::{Error, Result};
use crate::file::ArchivedFile;

/// Read every name through `resolve` and compress it with `codec`.
///
/// The first failure (in input order) is returned and no files are. Tasks
/// already running when another fails are not interrupted; their output is
/// dropped.
pub fn compress_inputs<S, F, C>(names: &[S], resolve: F, codec: &C) -> Result<Vec<ArchivedFile>>
where
    S: AsRef<str> + Sync,
    F: Fn(&str) -> io::Result<Vec<u8>> + Sync,
    C: Codec + ?Sized,
{
    let task = |index: usize, name: &str| -> (usize, Result<ArchivedFile>) {
        let result = resolve(name)
            .map_err(|source| Error::FileRead { path: name.into(), source })
            .and_then(|data| ArchivedFile::with_codec(name, &data, codec));
        (index, result)
    };

    #[cfg(feature = "parallel")]
    let tagged: Vec<(usize, Result<ArchivedFile>)> = {
        use rayon::prelude::*;
        names
            .par_iter()
            .enumerate()
            .map(|(i, name)| task(i, name.as_ref()))
            .collect()
    };

    #[cfg(not(feature = "parallel"))]
    let tagged: Vec<(usize, Result<ArchivedFile>)> = names
        .iter()
        .enumerate()
        .map(|(i, name)| task(i, name.as_ref()))
        .collect();

    reassemble(names.len(), tagged)
}

/// Place index-tagged results into a slot vector pre-sized to `count`.
fn reassemble(count: usize, tagged: Vec<(usize, Result<ArchivedFile>)>) -> Result<Vec<ArchivedFile>> {
    let mut slots: Vec<Option<ArchivedFile>> = (0..count).map(|_| None).collect();
    let mut first_error: Option<(usize, Error)> = None;

    for (index, result) in tagged {
        match result {
            Ok(file) => slots[index] = Some(file),
            Err(e) => {
                if first_error.as_ref().map_or(true, |(i, _)| index < *i) {
                    first_error = Some((index, e));
                }
            }
        }
    }

    if let Some((_, e)) = first_error {
        return Err(e);
    }
    Ok(slots.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::GzipCodec;

    fn in_memory(name: &str) -> io::Result<Vec<u8>> {
        match name {
            "missing" => Err(io::Error::new(io::ErrorKind::NotFound, "no such file")),
            other     => Ok(other.repeat(100).into_bytes()),
        }
    }

    #[test]
    fn preserves_input_order() {
        let names: Vec<String> = (0..64).map(|i| format!("file-{i:02}")).collect();
        let files = compress_inputs(&names, in_memory, &GzipCodec::default()).unwrap();
        assert_eq!(files.len(), names.len());
        for (file, name) in files.iter().zip(&names) {
            assert_eq!(file.name(), name);
            assert_eq!(file.decompressed().unwrap(), name.repeat(100).into_bytes());
        }
    }

    #[test]
    fn first_failure_aborts() {
        let names = ["a", "missing", "b"];
        let err = compress_inputs(&names, in_memory, &GzipCodec::default()).unwrap_err();
        assert!(matches!(err, Error::FileRead { ref path, .. } if path.to_str() == Some("missing")));
    }

    #[test]
    fn reassemble_reports_lowest_index_error() {
        let tagged = vec![
            (2, Err(Error::EntryNotFound("two".into()))),
            (0, Ok(ArchivedFile::from_compressed("zero", vec![]))),
            (1, Err(Error::EntryNotFound("one".into()))),
        ];
        let err = reassemble(3, tagged).unwrap_err();
        assert!(matches!(err, Error::EntryNotFound(n) if n == "one"));
    }

    #[test]
    fn empty_input_is_empty_output() {
        let names: [&str; 0] = [];
        assert!(compress_inputs(&names, in_memory, &GzipCodec::default()).unwrap().is_empty());
    }
}
