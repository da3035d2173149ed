use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use ndarray::Array2;
use ndarray_npy::{ReadNpyExt, WriteNpyExt};
use tracing::info;

use crate::data::window::TokenTable;
use crate::error::{Error, Result};

/// Default file name for the token cache.
pub const DEFAULT_CACHE_DESTINATION: &str = "dataset_cache.tar.gz";

/// Write the table as a gzip-compressed `.npy` array of shape
/// `[rows, block_size + 1]`.
pub fn save_cache<P: AsRef<Path>>(table: &TokenTable, path: P) -> Result<()> {
    let path = path.as_ref();
    let array = Array2::from_shape_vec((table.len(), table.width()), table.as_slice().to_vec())
        .map_err(|_| Error::RaggedTable {
            len: table.as_slice().len(),
            width: table.width(),
        })?;

    let file = File::create(path).map_err(Error::path(path))?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    array.write_npy(&mut encoder)?;
    encoder
        .finish()
        .and_then(|mut w| w.flush())
        .map_err(Error::path(path))?;

    info!(path = %path.display(), rows = table.len(), width = table.width(), "saved token cache");
    Ok(())
}

/// Read a table written by [`save_cache`].
///
/// Gzip streams are recognized by their magic bytes whatever the file name;
/// anything else is read as a plain `.npy` file.
pub fn load_cache<P: AsRef<Path>>(path: P) -> Result<TokenTable> {
    let path = path.as_ref();
    let file = File::open(path).map_err(Error::path(path))?;
    let mut reader = BufReader::new(file);

    let array = if is_gzip(&mut reader).map_err(Error::path(path))? {
        read_array(GzDecoder::new(reader))?
    } else {
        read_array(reader)?
    };

    let (rows, width) = array.dim();
    if width < 2 {
        return Err(Error::InvalidBlockSize(width.saturating_sub(1)));
    }
    // iter() walks in logical order whatever the memory layout
    let table = TokenTable::from_raw(width - 1, array.iter().copied().collect())?;

    info!(path = %path.display(), rows, width, "loaded token cache");
    Ok(table)
}

fn read_array<R: Read>(reader: R) -> Result<Array2<i64>> {
    Ok(Array2::<i64>::read_npy(reader)?)
}

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

fn is_gzip<R: BufRead>(reader: &mut R) -> std::io::Result<bool> {
    Ok(reader.fill_buf()?.starts_with(&GZIP_MAGIC))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CACHE_DESTINATION);

        let mut table = TokenTable::new(3).unwrap();
        table.push_document(&[5, 6, 7, 8, 9]);
        table.push_document(&[0, 1]);

        save_cache(&table, &path).unwrap();
        let loaded = load_cache(&path).unwrap();
        assert_eq!(loaded, table);
        assert_eq!(loaded.block_size(), 3);
        assert_eq!(loaded.len(), 3);

        // gzip magic
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..2], &[0x1f, 0x8b]);
    }

    #[test]
    fn test_cache_round_trip_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.npy.gz");

        let table = TokenTable::new(4).unwrap();
        save_cache(&table, &path).unwrap();
        let loaded = load_cache(&path).unwrap();
        assert!(loaded.is_empty());
        assert_eq!(loaded.width(), 5);
    }

    #[test]
    fn test_load_plain_npy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.npy");

        let array = Array2::from_shape_vec((2, 3), vec![1i64, 2, 3, 4, 5, 6]).unwrap();
        let mut file = File::create(&path).unwrap();
        array.write_npy(&mut file).unwrap();

        let loaded = load_cache(&path).unwrap();
        assert_eq!(loaded.block_size(), 2);
        assert_eq!(loaded.row(1).unwrap(), &[4, 5, 6]);
    }

    #[test]
    fn test_cache_round_trip_any_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let table = TokenTable::from_raw(2, vec![1, 2, 3, 4, 0, 0]).unwrap();

        for name in ["tokens.npy", "dataset_cache"] {
            let path = dir.path().join(name);
            save_cache(&table, &path).unwrap();
            assert_eq!(load_cache(&path).unwrap(), table, "{name}");
        }
    }

    #[test]
    fn test_load_missing_cache() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_cache(dir.path().join("missing.tar.gz")).unwrap_err();
        assert!(matches!(err, Error::Path { .. }));
    }
}
