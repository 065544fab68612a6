//! MUMmer `.delta` writer
//!
//! Layout:
//!
//! ```text
//! /path/ref.fa /path/qry.fa
//! NUCMER
//! >ref_id qry_id ref_len qry_len
//! s1 e1 s2 e2 errors similarity_errors non_alphas
//! delta
//! ...
//! 0
//! ```
//!
//! Coordinates are 1-based and inclusive. Reverse strand alignments are
//! written in forward query coordinates, so `s2 > e2`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use crate::delta::DeltaAlignment;
use crate::error::NucmerResult;
use crate::types::{Strand, REVERSE_SUFFIX};

pub struct DeltaWriter<W: Write> {
    writer: W,
    group: Option<(Arc<str>, Arc<str>)>,
}

impl DeltaWriter<BufWriter<File>> {
    pub fn create<P: AsRef<Path>>(path: P) -> NucmerResult<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> DeltaWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, group: None }
    }

    /// Write the two input paths and the program line.
    pub fn write_header(&mut self, reference_path: &str, query_path: &str) -> NucmerResult<()> {
        writeln!(self.writer, "{} {}", reference_path, query_path)?;
        writeln!(self.writer, "NUCMER")?;
        Ok(())
    }

    /// Write one alignment, opening a new `>` group when the sequence pair
    /// changes.
    pub fn write_alignment(&mut self, alignment: &DeltaAlignment) -> NucmerResult<()> {
        let query_id = query_name(alignment);
        let same_group = self.group.as_ref().map_or(false, |(reference, query)| {
            **reference == *alignment.reference_sequence_id && **query == *query_id
        });

        if !same_group {
            writeln!(
                self.writer,
                ">{} {} {} {}",
                alignment.reference_sequence_id, query_id, alignment.reference_length, alignment.query_length
            )?;
            self.group = Some((Arc::clone(&alignment.reference_sequence_id), Arc::from(query_id)));
        }

        let (query_start, query_end) = match alignment.query_direction {
            Strand::Forward => (alignment.second_sequence_start + 1, alignment.second_sequence_end + 1),
            Strand::Reverse => (
                alignment.query_length - alignment.second_sequence_start,
                alignment.query_length - alignment.second_sequence_end,
            ),
        };

        writeln!(
            self.writer,
            "{} {} {} {} {} {} {}",
            alignment.first_sequence_start + 1,
            alignment.first_sequence_end + 1,
            query_start,
            query_end,
            alignment.errors,
            alignment.similarity_errors,
            alignment.non_alphas
        )?;
        for delta in &alignment.deltas {
            writeln!(self.writer, "{}", delta)?;
        }
        writeln!(self.writer, "0")?;
        Ok(())
    }

    pub fn write_all<'a, I>(&mut self, alignments: I) -> NucmerResult<()>
    where
        I: IntoIterator<Item = &'a DeltaAlignment>,
    {
        let mut count = 0usize;
        for alignment in alignments {
            self.write_alignment(alignment)?;
            count += 1;
        }
        log::debug!("Wrote {} delta alignments", count);
        Ok(())
    }

    pub fn flush(&mut self) -> NucmerResult<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Query id as written to the file, without the strand suffix.
fn query_name(alignment: &DeltaAlignment) -> &str {
    let id = &*alignment.query_sequence_id;
    match alignment.query_direction {
        Strand::Reverse => id.strip_suffix(REVERSE_SUFFIX).unwrap_or(id),
        Strand::Forward => id,
    }
}
