use std::fs::File;
use std::hash::Hasher as _;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use twox_hash::XxHash64;

/// Bytes read per sampled window for the partial fingerprint.
const PARTIAL_WINDOW_SIZE: usize = 4096;

/// Files below this size hash the leading window only.
const SMALL_FILE_THRESHOLD: u64 = 1024 * 1024; // 1MiB
/// Files below this size add the trailing window; larger files also
/// sample the middle.
const MEDIUM_FILE_THRESHOLD: u64 = 10 * 1024 * 1024; // 10MiB

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashMode {
    Partial,
    Full,
}

/// Compute a file's 64-bit content fingerprint as lowercase hex.
///
/// `Partial` samples fixed 4KiB windows chosen by file size:
/// - < 1MiB: first window only
/// - < 10MiB: first and last windows
/// - >= 10MiB: first, middle, and last windows
///
/// Windows are fed into the hash in that order; short reads at end of
/// file contribute only the bytes actually read. `Full` streams the
/// entire file.
pub fn fingerprint(path: &Path, mode: HashMode) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = XxHash64::with_seed(0);

    match mode {
        HashMode::Partial => {
            let size = file.metadata()?.len();
            let mut window = [0u8; PARTIAL_WINDOW_SIZE];

            if size < SMALL_FILE_THRESHOLD {
                hash_window(&mut file, &mut hasher, &mut window)?;
            } else if size < MEDIUM_FILE_THRESHOLD {
                hash_window(&mut file, &mut hasher, &mut window)?;

                file.seek(SeekFrom::Start(size - PARTIAL_WINDOW_SIZE as u64))?;
                hash_window(&mut file, &mut hasher, &mut window)?;
            } else {
                hash_window(&mut file, &mut hasher, &mut window)?;

                let middle = size / 2 - PARTIAL_WINDOW_SIZE as u64 / 2;
                file.seek(SeekFrom::Start(middle))?;
                hash_window(&mut file, &mut hasher, &mut window)?;

                file.seek(SeekFrom::Start(size - PARTIAL_WINDOW_SIZE as u64))?;
                hash_window(&mut file, &mut hasher, &mut window)?;
            }
        }
        HashMode::Full => {
            let mut buffer = [0u8; 64 * 1024];
            loop {
                let read = file.read(&mut buffer)?;
                if read == 0 {
                    break;
                }
                hasher.write(&buffer[..read]);
            }
        }
    }

    Ok(format!("{:016x}", hasher.finish()))
}

fn hash_window(file: &mut File, hasher: &mut XxHash64, window: &mut [u8]) -> io::Result<()> {
    let mut filled = 0;
    while filled < window.len() {
        let read = file.read(&mut window[filled..])?;
        if read == 0 {
            break;
        }
        filled += read;
    }
    hasher.write(&window[..filled]);
    Ok(())
}
