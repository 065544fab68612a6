use nucdelta_core::delta::GAP;
use nucdelta_core::{
    Alphabet, DeltaAlignment, Nucmer, NucmerConfig, NucmerError, Sequence, Strand, StrandSelection,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn random_dna(length: usize, seed: u64) -> Vec<u8> {
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

/// Substitute every `spacing`-th residue, starting at `spacing`.
fn mutate(sequence: &[u8], spacing: usize) -> Vec<u8> {
    let mut mutated = sequence.to_vec();
    for position in (spacing..mutated.len()).step_by(spacing) {
        mutated[position] = match mutated[position] {
            b'A' => b'C',
            b'C' => b'G',
            b'G' => b'T',
            _ => b'A',
        };
    }
    mutated
}

fn ungapped(row: &[u8]) -> Vec<u8> {
    row.iter().copied().filter(|&c| c != GAP).collect()
}

fn assert_projects_back(alignment: &DeltaAlignment, reference: &[u8], query: &[u8]) {
    let aligned = alignment.convert_delta_to_sequences(reference, query);
    assert_eq!(aligned.first_sequence.len(), aligned.second_sequence.len());
    assert_eq!(
        ungapped(&aligned.first_sequence),
        &reference[alignment.first_sequence_start as usize..=alignment.first_sequence_end as usize]
    );
    assert_eq!(
        ungapped(&aligned.second_sequence),
        &query[alignment.second_sequence_start as usize..=alignment.second_sequence_end as usize]
    );
}

#[test]
fn single_reference_with_scattered_substitutions() {
    init_logging();
    let reference = random_dna(5000, 42);
    let query = mutate(&reference, 97);

    let nucmer = Nucmer::new(NucmerConfig::default()).unwrap();
    let results = nucmer
        .get_delta_alignments(
            &[Sequence::dna("chr1", reference.clone())],
            &[Sequence::dna("read1", query.clone())],
            nucmer.config().unique_in_reference,
        )
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].len(), 1);
    let alignment = &results[0][0];
    assert_eq!(&*alignment.reference_sequence_id, "chr1");
    assert_eq!(&*alignment.query_sequence_id, "read1");
    assert_eq!(alignment.query_direction, Strand::Forward);
    assert_eq!(alignment.first_sequence_start, 0);
    assert_eq!(alignment.first_sequence_end, 4999);
    assert_eq!(alignment.second_sequence_end, 4999);
    assert_eq!(alignment.errors as usize, (4999 / 97));
    assert_projects_back(alignment, &reference, &query);
}

#[test]
fn clusters_are_reported_per_query() {
    init_logging();
    let reference = random_dna(3000, 5);
    let near = mutate(&reference, 150);
    let unrelated = random_dna(3000, 77);

    let nucmer = Nucmer::new(NucmerConfig::default()).unwrap();
    let clusters = nucmer
        .get_clusters(
            &[Sequence::dna("ref", reference)],
            &[Sequence::dna("near", near), Sequence::dna("unrelated", unrelated)],
            nucmer.config().unique_in_reference,
        )
        .unwrap();

    assert_eq!(clusters.len(), 2);
    let near_clusters = clusters[0].as_ref().unwrap();
    assert_eq!(near_clusters.len(), 1);
    let matches = &near_clusters[0].matches;
    assert!(matches.len() > 10);
    for pair in matches.windows(2) {
        assert!(pair[0].query_offset < pair[1].query_offset);
        assert_eq!(pair[0].diagonal(), 0);
    }
    assert!(matches.iter().all(|m| &*m.query_id == "near"));

    // Random 20-mers in 3 kb hardly ever collide; either way nothing spans
    // the minimum score.
    match &clusters[1] {
        None => {}
        Some(found) => assert!(found.is_empty()),
    }
}

#[test]
fn multiple_references_are_remapped() {
    init_logging();
    let first = random_dna(1500, 1);
    let second = random_dna(1200, 2);
    // The run of N keeps the two pieces from extending into each other.
    let mut query = second[200..1000].to_vec();
    query.extend_from_slice(b"NNNNNNNNNN");
    query.extend_from_slice(&first[100..900]);

    let nucmer = Nucmer::new(NucmerConfig::default()).unwrap();
    let references = vec![
        Sequence::dna("first", first.clone()),
        Sequence::dna("second", second.clone()),
    ];
    let results = nucmer
        .get_delta_alignments(
            &references,
            &[Sequence::dna("query", query.clone())],
            nucmer.config().unique_in_reference,
        )
        .unwrap();

    let alignments = &results[0];
    assert_eq!(alignments.len(), 2);

    let on_second = alignments
        .iter()
        .find(|a| &*a.reference_sequence_id == "second")
        .unwrap();
    assert_eq!(on_second.first_sequence_start, 200);
    assert_eq!(on_second.first_sequence_end, 999);
    assert_eq!(on_second.second_sequence_start, 0);
    assert_eq!(on_second.reference_length, 1200);
    assert_projects_back(on_second, &second, &query);

    let on_first = alignments
        .iter()
        .find(|a| &*a.reference_sequence_id == "first")
        .unwrap();
    assert_eq!(on_first.first_sequence_start, 100);
    assert_eq!(on_first.first_sequence_end, 899);
    assert_eq!(on_first.second_sequence_start, 810);
    assert_eq!(on_first.second_sequence_end, 1609);
    assert_eq!(on_first.errors, 0);
    assert_projects_back(on_first, &first, &query);
}

#[test]
fn reverse_strand_alignments() {
    init_logging();
    let reference = random_dna(2000, 9);
    let query = bio::alphabets::dna::revcomp(&reference[300..1700]);

    let nucmer = Nucmer::new(NucmerConfig {
        strand: StrandSelection::Both,
        ..Default::default()
    })
    .unwrap();
    let results = nucmer
        .get_delta_alignments(
            &[Sequence::dna("chr", reference.clone())],
            &[Sequence::dna("contig", query.clone())],
            nucmer.config().unique_in_reference,
        )
        .unwrap();

    // Forward strand entry first, then the reverse strand.
    assert_eq!(results.len(), 2);
    assert!(results[0].is_empty());
    assert_eq!(results[1].len(), 1);

    let alignment = &results[1][0];
    assert_eq!(alignment.query_direction, Strand::Reverse);
    assert_eq!(&*alignment.query_sequence_id, "contig Reverse");
    assert_eq!(alignment.first_sequence_start, 300);
    assert_eq!(alignment.first_sequence_end, 1699);
    assert_eq!(alignment.second_sequence_start, 0);
    assert_eq!(alignment.second_sequence_end, 1399);
    assert_eq!(alignment.errors, 0);
}

#[test]
fn parallel_run_matches_sequential() {
    init_logging();
    let reference = random_dna(4000, 21);
    let queries: Vec<Sequence> = (0..4)
        .map(|i| Sequence::dna(format!("q{}", i), mutate(&reference[i * 500..i * 500 + 2000], 61 + i)))
        .collect();
    let references = vec![Sequence::dna("ref", reference)];

    let sequential = Nucmer::new(NucmerConfig::default())
        .unwrap()
        .get_delta_alignments(&references, &queries, true)
        .unwrap();
    let parallel = Nucmer::new(NucmerConfig {
        parallel: true,
        threads: 2,
        ..Default::default()
    })
    .unwrap()
    .get_delta_alignments(&references, &queries, true)
    .unwrap();

    assert_eq!(sequential, parallel);
    assert_eq!(sequential.len(), 4);
    for (i, alignments) in sequential.iter().enumerate() {
        assert_eq!(alignments.len(), 1);
        assert_eq!(alignments[0].first_sequence_start, (i * 500) as i64);
    }
}

#[test]
fn extension_keeps_coordinates_ordered() {
    init_logging();
    let reference = random_dna(6000, 33);
    // Deletions and an insertion inside otherwise identical sequence.
    let mut query = reference.clone();
    query.drain(1500..1503);
    query.insert(3000, b'T');
    query.insert(3000, b'T');
    query.drain(4500..4501);

    let nucmer = Nucmer::new(NucmerConfig {
        unique_in_reference: false,
        ..Default::default()
    })
    .unwrap();
    let results = nucmer
        .get_delta_alignments(
            &[Sequence::dna("ref", reference.clone())],
            &[Sequence::dna("qry", query.clone())],
            nucmer.config().unique_in_reference,
        )
        .unwrap();

    assert!(!results[0].is_empty());
    for alignment in &results[0] {
        assert!(alignment.first_sequence_end >= alignment.first_sequence_start);
        assert!(alignment.second_sequence_end >= alignment.second_sequence_start);
        assert_projects_back(alignment, &reference, &query);
    }
    let covered: i64 = results[0].iter().map(|a| a.reference_span()).sum();
    assert!(covered >= 5900);
}

#[test]
fn input_errors_are_reported() {
    let nucmer = Nucmer::new(NucmerConfig::default()).unwrap();
    let dna = Sequence::dna("dna", random_dna(200, 3));
    let rna = Sequence::new("rna", Alphabet::Rna, random_dna(200, 4));
    let tiny = Sequence::dna("tiny", b"ACGTACGTACGTACGTACGT".to_vec());

    assert!(matches!(
        nucmer.get_delta_alignments(&[dna.clone()], &[rna], true),
        Err(NucmerError::AlphabetMismatch { .. })
    ));
    // Exactly length_of_mum residues is not enough.
    assert!(matches!(
        nucmer.get_delta_alignments(&[dna], &[tiny], true),
        Err(NucmerError::SequenceTooShort { .. })
    ));
    assert!(matches!(
        Nucmer::new(NucmerConfig {
            length_of_mum: -3,
            ..Default::default()
        }),
        Err(NucmerError::InvalidConfiguration(_))
    ));
}
