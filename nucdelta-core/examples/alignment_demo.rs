//! NucDelta Alignment Demo
//!
//! Clusters exact matches between a small reference and two queries, then
//! prints the resulting delta alignments in MUMmer format.

use nucdelta_core::{DeltaWriter, Nucmer, NucmerConfig, Sequence, StrandSelection};

fn pseudo_random_dna(length: usize, seed: u64) -> Vec<u8> {
    let mut state = seed;
    (0..length)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            b"ACGT"[(state >> 62) as usize]
        })
        .collect()
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let reference = pseudo_random_dna(4000, 11);

    // A copy of 1..2.5 kb with a substitution and a 3 bp deletion
    let mut near = reference[1000..2500].to_vec();
    near[400] = if near[400] == b'A' { b'C' } else { b'A' };
    near.drain(900..903);

    // The reverse complement of 2.8..3.6 kb
    let flipped = bio::alphabets::dna::revcomp(&reference[2800..3600]);

    let nucmer = Nucmer::new(NucmerConfig {
        strand: StrandSelection::Both,
        ..Default::default()
    })?;

    let unique = nucmer.config().unique_in_reference;
    let references = vec![Sequence::dna("chr1", reference)];
    let queries = vec![Sequence::dna("near", near), Sequence::dna("flipped", flipped)];

    println!("NucDelta Alignment Demo");
    println!("=======================\n");

    for (i, clusters) in nucmer.get_clusters(&references, &queries, unique)?.iter().enumerate() {
        match clusters {
            Some(clusters) => println!("Strand {}: {} clusters", i, clusters.len()),
            None => println!("Strand {}: no matches", i),
        }
    }
    println!();

    let results = nucmer.get_delta_alignments(&references, &queries, unique)?;
    let mut writer = DeltaWriter::new(std::io::stdout().lock());
    writer.write_header("chr1.fa", "queries.fa")?;
    writer.write_all(results.iter().flatten())?;
    writer.flush()?;

    Ok(())
}
