use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

pub fn open_file<P: AsRef<Path>>(path: P) -> io::Result<File> {
    File::open(&path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            io::Error::new(e.kind(), format!("File not found: {:?}", path.as_ref()))
        } else {
            e
        }
    })
}

/// Whether a file name carries a gzip suffix.
pub fn has_gzip_suffix<P: AsRef<Path>>(path: P) -> bool {
    let name = path.as_ref().to_string_lossy();
    name.ends_with(".gz") || name.ends_with(".gzip")
}

/// Opens a text file for line reading, decompressing it when `gzipped`.
pub fn open_text<P: AsRef<Path>>(path: P, gzipped: bool) -> io::Result<Box<dyn BufRead>> {
    let file = open_file(path)?;
    if gzipped {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Last `/`-separated component of a path-like string.
pub fn trim_file_path(file_name: &str) -> &str {
    file_name.rsplit('/').next().unwrap_or(file_name)
}

/// Renders a float the way the reports have always printed them: shortest
/// round-trip digits, a trailing `.0` on integral values, and exponent
/// notation with at least two exponent digits outside `[1e-4, 1e16)`.
///
/// ```
/// # use sylph_tax::utils::format_float;
/// assert_eq!(format_float(100.0), "100.0");
/// assert_eq!(format_float(0.5), "0.5");
/// assert_eq!(format_float(5e-5), "5e-05");
/// ```
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let magnitude = value.abs();
    if magnitude != 0.0 && (magnitude < 1e-4 || magnitude >= 1e16) {
        let formatted = format!("{:e}", value);
        return match formatted.split_once('e') {
            Some((mantissa, exponent)) => {
                let (sign, digits) = match exponent.strip_prefix('-') {
                    Some(digits) => ('-', digits),
                    None => ('+', exponent),
                };
                format!("{}e{}{:0>2}", mantissa, sign, digits)
            }
            None => formatted,
        };
    }

    let formatted = format!("{}", value);
    if formatted.contains('.') {
        formatted
    } else {
        format!("{}.0", formatted)
    }
}
