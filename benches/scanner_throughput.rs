use criterion::{criterion_group, criterion_main, Criterion};
use phylostream::event::EventReader;
use phylostream::newick::scanner::NewickScanner;
use phylostream::newick::NewickEventReader;
use phylostream::nexus::NexusEventReader;
use phylostream::parser::TextParser;
use phylostream::ReadWriteParameterMap;

/// Builds a balanced Newick string with `leaves` labeled leaves.
fn generate_newick(leaves: usize) -> String {
    fn subtree(out: &mut String, first: usize, count: usize) {
        if count == 1 {
            out.push_str(&format!("t{first}:1.0"));
            return;
        }
        let half = count / 2;
        out.push('(');
        subtree(out, first, half);
        out.push(',');
        subtree(out, first + half, count - half);
        out.push_str("):0.5");
    }
    let mut out = String::new();
    subtree(&mut out, 0, leaves);
    out.push(';');
    out
}

/// Wraps trees in a Nexus TREES block with a TRANSLATE table.
fn generate_nexus(leaves: usize, trees: usize) -> String {
    let mut out = String::from("#NEXUS\nBEGIN TAXA;\n\tDIMENSIONS NTAX=");
    out.push_str(&leaves.to_string());
    out.push_str(";\n\tTAXLABELS");
    for i in 0..leaves {
        out.push_str(&format!(" t{i}"));
    }
    out.push_str(";\nEND;\nBEGIN TREES;\n\tTRANSLATE\n");
    for i in 0..leaves {
        let separator = if i + 1 < leaves { "," } else { "" };
        out.push_str(&format!("\t\t{} t{i}{separator}\n", i + 1));
    }
    out.push_str("\t;\n");
    let newick = generate_newick(leaves);
    for i in 0..trees {
        out.push_str(&format!("\tTREE tree{i} = {newick}\n"));
    }
    out.push_str("END;\n");
    out
}

fn scan_tokens(input: &str) -> usize {
    let mut parser = TextParser::for_str(input);
    let mut scanner = NewickScanner::new(false);
    let mut count = 0;
    while scanner.next(&mut parser).unwrap().is_some() {
        count += 1;
    }
    count
}

fn read_events(input: &str) -> usize {
    let mut reader = NewickEventReader::from_str(input);
    let mut count = 0;
    while reader.next().unwrap().is_some() {
        count += 1;
    }
    count
}

fn read_nexus(input: &str) -> usize {
    let mut reader =
        NexusEventReader::new(TextParser::for_str(input), ReadWriteParameterMap::default());
    let mut count = 0;
    while reader.next().unwrap().is_some() {
        count += 1;
    }
    count
}

fn scanner_throughput(c: &mut Criterion) {
    for leaves in [128usize, 1024] {
        let input = generate_newick(leaves);
        c.bench_function(&format!("scan_newick_{leaves}"), |b| {
            b.iter(|| scan_tokens(&input));
        });
    }
}

fn reader_throughput(c: &mut Criterion) {
    for leaves in [128usize, 1024] {
        let input = generate_newick(leaves);
        c.bench_function(&format!("read_newick_{leaves}"), |b| {
            b.iter(|| read_events(&input));
        });
    }

    let nexus = generate_nexus(128, 50);
    c.bench_function("read_nexus_trees_block", |b| {
        b.iter(|| read_nexus(&nexus));
    });
}

criterion_group!(scanning, scanner_throughput);
criterion_group! {
    name = reading;
    config = Criterion::default().sample_size(20);
    targets = reader_throughput
}
criterion_main!(scanning, reading);
