//! Xcursor file decoding.
//!
//! Layout (all fields little-endian u32):
//! - file header: magic `Xcur`, header length, version, TOC count
//! - TOC entries: type, subtype, byte position
//! - image chunk: header length, type, nominal size, version, width, height,
//!   xhot, yhot, delay, then width*height premultiplied ARGB pixels
//! - comment chunk: header length, type, comment kind, version, byte length,
//!   then UTF-8 text

use crate::error::{PreviewError, XcursorError};
use image::{Rgba, RgbaImage};
use log::info;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

pub const XCURSOR_MAGIC: &[u8; 4] = b"Xcur";
pub const IMAGE_TYPE: u32 = 0xfffd_0002;
pub const COMMENT_TYPE: u32 = 0xfffe_0001;
/// Largest width or height accepted for a frame.
pub const MAX_IMAGE_DIM: u32 = 0x7fff;

const FILE_HEADER_LEN: usize = 16;
const TOC_ENTRY_LEN: usize = 12;
const IMAGE_HEADER_LEN: usize = 36;
const COMMENT_HEADER_LEN: usize = 20;

/// One decoded cursor image.
#[derive(Clone, Debug)]
pub struct XcursorFrame {
    pub nominal_size: u32,
    pub xhot: u32,
    pub yhot: u32,
    /// Animation delay in milliseconds.
    pub delay: u32,
    /// Straight (non-premultiplied) RGBA.
    pub image: RgbaImage,
}

impl XcursorFrame {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XcursorComment {
    /// 1 copyright, 2 license, 3 other.
    pub kind: u32,
    pub text: String,
}

/// All frames and comments of one Xcursor file, in table order.
#[derive(Clone, Debug, Default)]
pub struct Xcursor {
    pub frames: Vec<XcursorFrame>,
    pub comments: Vec<XcursorComment>,
}

pub fn is_xcursor(data: &[u8]) -> bool {
    data.starts_with(XCURSOR_MAGIC)
}

struct Reader<'a> {
    data: &'a [u8],
}

impl Reader<'_> {
    fn u32_at(&self, offset: usize) -> Result<u32, XcursorError> {
        offset
            .checked_add(4)
            .and_then(|end| self.data.get(offset..end))
            .and_then(|b| b.try_into().ok())
            .map(u32::from_le_bytes)
            .ok_or(XcursorError::Truncated(offset))
    }

    fn bytes(&self, offset: usize, len: usize) -> Result<&[u8], XcursorError> {
        offset
            .checked_add(len)
            .and_then(|end| self.data.get(offset..end))
            .ok_or(XcursorError::Truncated(offset))
    }
}

impl Xcursor {
    pub fn open(path: &Path) -> Result<Self, PreviewError> {
        let data = fs::read(path)?;
        Ok(Self::from_bytes(&data)?)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, XcursorError> {
        if !is_xcursor(data) {
            return Err(XcursorError::BadMagic);
        }
        let reader = Reader { data };

        let header_len = reader.u32_at(4)? as usize;
        let ntoc = reader.u32_at(12)? as usize;
        let toc_start = header_len.max(FILE_HEADER_LEN);

        // Reject absurd counts before allocating anything.
        let toc_len = ntoc
            .checked_mul(TOC_ENTRY_LEN)
            .ok_or(XcursorError::Truncated(toc_start))?;
        reader.bytes(toc_start, toc_len)?;

        let mut cursor = Xcursor::default();

        for i in 0..ntoc {
            let entry = toc_start + i * TOC_ENTRY_LEN;
            let chunk_type = reader.u32_at(entry)?;
            let subtype = reader.u32_at(entry + 4)?;
            let position = reader.u32_at(entry + 8)? as usize;

            match chunk_type {
                IMAGE_TYPE => cursor.frames.push(read_image(&reader, position, subtype)?),
                COMMENT_TYPE => cursor.comments.push(read_comment(&reader, position, subtype)?),
                // unknown chunk types are skipped, as libXcursor does
                _ => {}
            }
        }

        if cursor.frames.is_empty() {
            return Err(XcursorError::NoImages);
        }
        Ok(cursor)
    }

    /// Distinct nominal sizes, ascending.
    pub fn nominal_sizes(&self) -> Vec<u32> {
        let mut sizes: Vec<u32> = self.frames.iter().map(|f| f.nominal_size).collect();
        sizes.sort_unstable();
        sizes.dedup();
        sizes
    }

    /// First frame of the largest nominal size not above `edge`,
    /// else of the smallest size available.
    pub fn best_frame(&self, edge: u32) -> Option<&XcursorFrame> {
        let sizes = self.nominal_sizes();
        let pick = sizes
            .iter()
            .rev()
            .find(|s| **s <= edge)
            .or_else(|| sizes.first())?;
        self.frames.iter().find(|f| f.nominal_size == *pick)
    }
}

fn read_chunk_header(
    reader: &Reader<'_>,
    position: usize,
    expected_type: u32,
    expected_subtype: u32,
) -> Result<usize, XcursorError> {
    let header_len = reader.u32_at(position)? as usize;
    let chunk_type = reader.u32_at(position + 4)?;
    let subtype = reader.u32_at(position + 8)?;
    if chunk_type != expected_type || subtype != expected_subtype {
        return Err(XcursorError::ChunkMismatch { position });
    }
    Ok(header_len)
}

fn read_image(
    reader: &Reader<'_>,
    position: usize,
    nominal_size: u32,
) -> Result<XcursorFrame, XcursorError> {
    let header_len = read_chunk_header(reader, position, IMAGE_TYPE, nominal_size)?;
    let width = reader.u32_at(position + 16)?;
    let height = reader.u32_at(position + 20)?;
    let xhot = reader.u32_at(position + 24)?;
    let yhot = reader.u32_at(position + 28)?;
    let delay = reader.u32_at(position + 32)?;

    if width == 0 || height == 0 || width > MAX_IMAGE_DIM || height > MAX_IMAGE_DIM {
        return Err(XcursorError::TooLarge { width, height });
    }

    let pixel_start = position + header_len.max(IMAGE_HEADER_LEN);
    let count = (width as usize) * (height as usize);
    let raw = reader.bytes(pixel_start, count * 4)?;

    let mut image = RgbaImage::new(width, height);
    for (pixel, chunk) in image.pixels_mut().zip(raw.chunks_exact(4)) {
        let argb = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        *pixel = unpremultiply(argb);
    }

    Ok(XcursorFrame {
        nominal_size,
        xhot: xhot.min(width),
        yhot: yhot.min(height),
        delay,
        image,
    })
}

fn read_comment(
    reader: &Reader<'_>,
    position: usize,
    kind: u32,
) -> Result<XcursorComment, XcursorError> {
    let header_len = read_chunk_header(reader, position, COMMENT_TYPE, kind)?;
    let length = reader.u32_at(position + 16)? as usize;
    let text_start = position + header_len.max(COMMENT_HEADER_LEN);
    let bytes = reader.bytes(text_start, length)?;

    Ok(XcursorComment {
        kind,
        text: String::from_utf8_lossy(bytes).into_owned(),
    })
}

/// Convert one premultiplied ARGB32 pixel to straight RGBA.
pub fn unpremultiply(argb: u32) -> Rgba<u8> {
    let a = (argb >> 24) & 0xff;
    if a == 0 {
        return Rgba([0, 0, 0, 0]);
    }

    let straighten = |c: u32| ((c * 255 + a / 2) / a).min(255) as u8;
    Rgba([
        straighten((argb >> 16) & 0xff),
        straighten((argb >> 8) & 0xff),
        straighten(argb & 0xff),
        a as u8,
    ])
}

/// Write every frame of `cursor` as `frame_NNN.png` into `out_dir`, plus a
/// `cursor_info.txt` frame table. Returns the written frame paths.
pub fn export_frames(
    cursor: &Xcursor,
    source: &Path,
    out_dir: &Path,
) -> Result<Vec<PathBuf>, PreviewError> {
    fs::create_dir_all(out_dir)?;

    let mut written = Vec::with_capacity(cursor.frames.len());
    for (i, frame) in cursor.frames.iter().enumerate() {
        let path = out_dir.join(format!("frame_{:03}.png", i + 1));
        frame.image.save(&path)?;
        info!(
            "Saved frame {}: {}x{} (size={}, delay={}ms) -> {}",
            i + 1,
            frame.width(),
            frame.height(),
            frame.nominal_size,
            frame.delay,
            path.display()
        );
        written.push(path);
    }

    fs::write(out_dir.join("cursor_info.txt"), cursor_info(cursor, source))?;
    Ok(written)
}

fn cursor_info(cursor: &Xcursor, source: &Path) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Cursor File: {}", source.display());
    let _ = writeln!(out, "Number of frames: {}", cursor.frames.len());
    let _ = writeln!(out);
    let _ = writeln!(out, "Frame Details:");
    let _ = writeln!(out, "Frame\tSize\tWidth\tHeight\tXHot\tYHot\tDelay");
    for (i, f) in cursor.frames.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}\t{}x{}\t{}\t{}\t{}\t{}\t{}",
            i + 1,
            f.nominal_size,
            f.nominal_size,
            f.width(),
            f.height(),
            f.xhot,
            f.yhot,
            f.delay
        );
    }

    if !cursor.comments.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Comments:");
        for c in &cursor.comments {
            let _ = writeln!(out, "Type {}: {}", c.kind, c.text);
        }
    }
    out
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Build an Xcursor file from (nominal size, edge, ARGB fill) frames.
    pub(crate) fn build_xcursor(frames: &[(u32, u32, u32)], comment: Option<&str>) -> Vec<u8> {
        let ntoc = frames.len() + comment.map_or(0, |_| 1);
        let mut toc = Vec::new();
        let mut chunks = Vec::new();
        let mut position = FILE_HEADER_LEN + ntoc * TOC_ENTRY_LEN;

        for &(nominal, edge, fill) in frames {
            toc.extend_from_slice(&[IMAGE_TYPE, nominal, position as u32]);
            let mut chunk = Vec::new();
            for v in [36, IMAGE_TYPE, nominal, 1, edge, edge, edge / 2, edge / 2, 50] {
                chunk.extend_from_slice(&u32::to_le_bytes(v));
            }
            for _ in 0..edge * edge {
                chunk.extend_from_slice(&fill.to_le_bytes());
            }
            position += chunk.len();
            chunks.push(chunk);
        }

        if let Some(text) = comment {
            toc.extend_from_slice(&[COMMENT_TYPE, 1, position as u32]);
            let mut chunk = Vec::new();
            for v in [20, COMMENT_TYPE, 1, 1, text.len() as u32] {
                chunk.extend_from_slice(&u32::to_le_bytes(v));
            }
            chunk.extend_from_slice(text.as_bytes());
            chunks.push(chunk);
        }

        let mut data = Vec::new();
        data.extend_from_slice(XCURSOR_MAGIC);
        for v in [16u32, 0x1_0000, ntoc as u32] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        for v in toc {
            data.extend_from_slice(&v.to_le_bytes());
        }
        for chunk in chunks {
            data.extend_from_slice(&chunk);
        }
        data
    }

    #[test]
    fn test_unpremultiply() {
        assert_eq!(unpremultiply(0x0000_0000), Rgba([0, 0, 0, 0]));
        assert_eq!(unpremultiply(0x00ff_ffff), Rgba([0, 0, 0, 0]));
        assert_eq!(unpremultiply(0xff10_2030), Rgba([0x10, 0x20, 0x30, 0xff]));
        // half alpha, half intensity red -> full red
        assert_eq!(unpremultiply(0x8080_0000), Rgba([255, 0, 0, 0x80]));
    }

    #[test]
    fn test_decode_frames_and_comment() {
        let data = build_xcursor(
            &[(24, 24, 0xff00_00ff), (48, 48, 0xff00_ff00), (48, 48, 0xffff_0000)],
            Some("CC-BY-SA"),
        );
        let cursor = Xcursor::from_bytes(&data).unwrap();

        assert_eq!(cursor.frames.len(), 3);
        assert_eq!(cursor.nominal_sizes(), vec![24, 48]);
        assert_eq!(cursor.frames[0].image.get_pixel(0, 0), &Rgba([0, 0, 255, 255]));
        assert_eq!(cursor.frames[1].xhot, 24);
        assert_eq!(cursor.frames[1].delay, 50);
        assert_eq!(
            cursor.comments,
            vec![XcursorComment {
                kind: 1,
                text: "CC-BY-SA".to_string()
            }]
        );
    }

    #[test]
    fn test_best_frame() {
        let data = build_xcursor(&[(24, 24, 0xff00_0000), (48, 48, 0xff00_0000)], None);
        let cursor = Xcursor::from_bytes(&data).unwrap();

        assert_eq!(cursor.best_frame(64).unwrap().nominal_size, 48);
        assert_eq!(cursor.best_frame(32).unwrap().nominal_size, 24);
        assert_eq!(cursor.best_frame(8).unwrap().nominal_size, 24);
    }

    #[test]
    fn test_reject_bad_data() {
        assert_eq!(Xcursor::from_bytes(b"\x89PNG").unwrap_err(), XcursorError::BadMagic);

        let data = build_xcursor(&[(24, 24, 0xff00_0000)], None);
        assert!(matches!(
            Xcursor::from_bytes(&data[..data.len() - 10]),
            Err(XcursorError::Truncated(_))
        ));

        let empty = build_xcursor(&[], None);
        assert_eq!(Xcursor::from_bytes(&empty).unwrap_err(), XcursorError::NoImages);
    }

    #[test]
    fn test_export_frames() {
        let tmp = TempDir::new().unwrap();
        let data = build_xcursor(&[(24, 24, 0xff00_0000), (32, 32, 0xff00_0000)], Some("hi"));
        let cursor = Xcursor::from_bytes(&data).unwrap();

        let out = tmp.path().join("frames");
        let written = export_frames(&cursor, Path::new("left_ptr"), &out).unwrap();
        assert_eq!(written.len(), 2);
        assert!(out.join("frame_002.png").is_file());

        let info = fs::read_to_string(out.join("cursor_info.txt")).unwrap();
        assert!(info.contains("Number of frames: 2"));
        assert!(info.contains("2\t32x32\t32\t32\t16\t16\t50"));
        assert!(info.contains("Type 1: hi"));
    }
}
