use nucdelta_core::{DeltaWriter, Nucmer, NucmerConfig, Sequence, StrandSelection};

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

#[test]
fn pipeline_output_in_delta_format() {
    let _ = env_logger::builder().is_test(true).try_init();

    let reference = random_dna(3000, 17);
    let forward = reference[500..1500].to_vec();
    let reverse = bio::alphabets::dna::revcomp(&reference[1800..2600]);

    let nucmer = Nucmer::new(NucmerConfig {
        strand: StrandSelection::Both,
        ..Default::default()
    })
    .unwrap();
    let results = nucmer
        .get_delta_alignments(
            &[Sequence::dna("chr7", reference)],
            &[Sequence::dna("fwd", forward), Sequence::dna("rev", reverse)],
            nucmer.config().unique_in_reference,
        )
        .unwrap();

    let mut writer = DeltaWriter::new(Vec::new());
    writer.write_header("/data/ref.fa", "/data/qry.fa").unwrap();
    writer.write_all(results.iter().flatten()).unwrap();
    let text = String::from_utf8(writer.into_inner()).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines[0], "/data/ref.fa /data/qry.fa");
    assert_eq!(lines[1], "NUCMER");

    let headers: Vec<&str> = lines.iter().copied().filter(|l| l.starts_with('>')).collect();
    assert_eq!(headers, vec![">chr7 fwd 3000 1000", ">chr7 rev 3000 800"]);

    // Forward block, no gaps.
    let forward_at = lines.iter().position(|l| *l == ">chr7 fwd 3000 1000").unwrap();
    assert_eq!(lines[forward_at + 1], "501 1500 1 1000 0 0 0");
    assert_eq!(lines[forward_at + 2], "0");

    // Reverse block in forward query coordinates.
    let reverse_at = lines.iter().position(|l| *l == ">chr7 rev 3000 800").unwrap();
    assert_eq!(lines[reverse_at + 1], "1801 2600 800 1 0 0 0");
    assert_eq!(lines[reverse_at + 2], "0");
    assert_eq!(lines.len(), reverse_at + 3);
}

#[test]
fn writer_to_file() {
    let reference = random_dna(1200, 4);
    let query = reference[100..1100].to_vec();

    let nucmer = Nucmer::new(NucmerConfig::default()).unwrap();
    let results = nucmer
        .get_delta_alignments(
            &[Sequence::dna("ref", reference)],
            &[Sequence::dna("qry", query)],
            nucmer.config().unique_in_reference,
        )
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.delta");
    let mut writer = DeltaWriter::create(&path).unwrap();
    writer.write_header("ref.fa", "qry.fa").unwrap();
    writer.write_all(results.iter().flatten()).unwrap();
    writer.flush().unwrap();
    drop(writer);

    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(
        content,
        "ref.fa qry.fa\nNUCMER\n>ref qry 1200 1000\n101 1100 1 1000 0 0 0\n0\n"
    );
}
