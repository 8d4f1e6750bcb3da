//! Splitting a source into the parts of a multipart upload.
use crate::MAX_PART_COUNT;
use crate::error::{ErrorRepr, Result};
use crate::request::PartNumber;

use std::ops::Deref;

/// One contiguous byte range of the source, uploaded as an independent part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Part {
    /// The 1-based number of the part in the upload.
    pub part_number: PartNumber,
    /// Offset of the first byte of the part in the source.
    pub offset: u64,
    /// Length of the part in bytes.
    pub len: u64,
}

impl Part {
    /// Offset one past the last byte of the part.
    pub fn end(&self) -> u64 {
        self.offset + self.len
    }
}

/// The ordered parts that exactly cover a source of `file_size` bytes.
///
/// Every part is `part_size` bytes long except possibly the last, which has
/// between 1 and `part_size` bytes.
///
/// ```rust
/// use multipart_file_upload::plan::PartPlan;
///
/// let plan = PartPlan::new(12, 5).unwrap();
/// let lens: Vec<u64> = plan.iter().map(|p| p.len).collect();
/// assert_eq!(lens, vec![5, 5, 2]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartPlan {
    parts: Vec<Part>,
    file_size: u64,
    part_size: u64,
}

impl PartPlan {
    /// Plan the parts for a source of `file_size` bytes with parts of
    /// `part_size` bytes, allowing at most [`MAX_PART_COUNT`] parts.
    ///
    /// # Errors
    ///
    /// Fails if `part_size` is zero, if the source is empty, or if more than
    /// [`MAX_PART_COUNT`] parts would be needed.
    pub fn new(file_size: u64, part_size: u64) -> Result<Self> {
        Self::with_max_parts(file_size, part_size, MAX_PART_COUNT)
    }

    /// Plan the parts allowing at most `max_parts` parts.
    pub fn with_max_parts(file_size: u64, part_size: u64, max_parts: u64) -> Result<Self> {
        if part_size == 0 {
            return Err(ErrorRepr::Config("part size must be positive".into()))?;
        }
        // Storage requires at least one part with at least one byte.
        if file_size == 0 {
            return Err(ErrorRepr::EmptyFile)?;
        }
        let max_parts = max_parts.min(i32::MAX as u64);
        let count = file_size.div_ceil(part_size);
        if count > max_parts {
            return Err(ErrorRepr::TooManyParts {
                parts: count,
                max_parts,
                min_part_size: Self::min_part_size(file_size, max_parts),
            })?;
        }

        let parts = (0..count)
            .map(|i| {
                let offset = i * part_size;
                Part {
                    part_number: PartNumber::new(i as i32 + 1),
                    offset,
                    len: part_size.min(file_size - offset),
                }
            })
            .collect();

        Ok(Self {
            parts,
            file_size,
            part_size,
        })
    }

    /// The smallest part size that covers `file_size` bytes in at most
    /// `max_parts` parts.
    pub fn min_part_size(file_size: u64, max_parts: u64) -> u64 {
        file_size.div_ceil(max_parts.max(1))
    }

    /// Size in bytes of the source this plan covers.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Configured size in bytes of every part but the last.
    pub fn part_size(&self) -> u64 {
        self.part_size
    }

    /// Whether `part` is one of the planned parts.
    pub fn contains(&self, part: &Part) -> bool {
        let idx = *part.part_number as usize;
        idx >= 1 && self.parts.get(idx - 1) == Some(part)
    }
}

impl Deref for PartPlan {
    type Target = [Part];

    fn deref(&self) -> &Self::Target {
        &self.parts
    }
}
