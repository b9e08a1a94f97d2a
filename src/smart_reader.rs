use flate2::read::{DeflateDecoder, MultiGzDecoder};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const ZIP_MAGIC: [u8; 4] = [0x50, 0x4b, 0x03, 0x04];
const MAX_LAYERS: usize = 4;

/// Opens a genotype export, peeling off gzip and single-entry zip layers so the
/// caller always sees plain text lines. Vendors ship both, sometimes nested.
pub fn open_input(path: &Path) -> io::Result<Box<dyn BufRead + Send>> {
    let file = File::open(path)?;
    let mut reader: Box<dyn BufRead + Send> = Box::new(BufReader::new(file));

    for _ in 0..MAX_LAYERS {
        let (is_gzip, is_zip) = {
            let buf = reader.fill_buf()?;
            (buf.starts_with(&GZIP_MAGIC), buf.starts_with(&ZIP_MAGIC))
        };

        if is_gzip {
            tracing::debug!(path = %path.display(), "detected gzip layer");
            reader = Box::new(BufReader::new(MultiGzDecoder::new(reader)));
        } else if is_zip {
            tracing::debug!(path = %path.display(), "detected zip layer");
            reader = Box::new(BufReader::new(first_zip_entry(reader)?));
        } else {
            break;
        }
    }
    Ok(reader)
}

/// Streams the first entry of a zip archive from its local file header.
fn first_zip_entry(mut reader: Box<dyn BufRead + Send>) -> io::Result<Box<dyn Read + Send>> {
    let mut header = [0u8; 30];
    reader.read_exact(&mut header)?;

    let flags = u16::from_le_bytes([header[6], header[7]]);
    let method = u16::from_le_bytes([header[8], header[9]]);
    let compressed_size =
        u32::from_le_bytes([header[18], header[19], header[20], header[21]]) as u64;
    let name_len = u16::from_le_bytes([header[26], header[27]]) as u64;
    let extra_len = u16::from_le_bytes([header[28], header[29]]) as u64;

    io::copy(&mut reader.by_ref().take(name_len + extra_len), &mut io::sink())?;

    match method {
        8 => Ok(Box::new(DeflateDecoder::new(reader))),
        // Bit 3 means the size trails the data, so a stored entry runs to EOF.
        0 if flags & 0x0008 != 0 => Ok(Box::new(reader)),
        0 => Ok(Box::new(reader.take(compressed_size))),
        other => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("unsupported zip compression method {other}"),
        )),
    }
}
