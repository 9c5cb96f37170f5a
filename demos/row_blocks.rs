// demos/row_blocks.rs
// cargo mpirun -n 4 --features mpi-support --example row_blocks
// cargo run --example row_blocks -- 4
//
// Row-block matrix product C = A * B. The root splits the rows of A into
// near-equal contiguous blocks with `scatter_blocks`, hands every rank a copy
// of B with `scatter`, and collects the result blocks with `gather`.

use rank_scatter::prelude::*;
use std::time::Instant;

const NRA: usize = 62; // rows in A
const NCA: usize = 15; // columns in A
const NCB: usize = 7; // columns in B

type Matrix = Vec<Vec<f64>>;

fn build_a() -> Matrix {
    (0..NRA)
        .map(|i| (0..NCA).map(|j| (i + j) as f64).collect())
        .collect()
}

fn build_b() -> Matrix {
    (0..NCA)
        .map(|i| (0..NCB).map(|j| (i * j) as f64).collect())
        .collect()
}

fn multiply(rows: &[Vec<f64>], b: &Matrix) -> Matrix {
    rows.iter()
        .map(|row| {
            (0..NCB)
                .map(|k| row.iter().zip(b).map(|(a, b_row)| a * b_row[k]).sum())
                .collect()
        })
        .collect()
}

fn run_rank<C: Communicator>(comm: &C) -> Result<Option<Matrix>, ScatterError> {
    const ROOT: usize = 0;
    let rank = comm.rank();
    let is_root = rank == ROOT;
    let cfg = ScatterConfig::default();

    let rows = scatter_blocks(
        comm,
        ROOT,
        if is_root { RootInput::Payload(build_a()) } else { RootInput::NonRoot },
        &cfg.with_tag(cfg.tag.offset(1)),
    )?;
    let b: Matrix = scatter(
        comm,
        ROOT,
        if is_root {
            RootInput::Payload(vec![build_b(); comm.size()])
        } else {
            RootInput::NonRoot
        },
        &cfg.with_tag(cfg.tag.offset(2)),
    )?;
    println!("[rank {rank}] computing rows {:?}", rows.range());

    let partial = Block {
        offset: rows.offset,
        items: multiply(&rows.items, &b),
    };
    let Some(blocks) = gather(comm, ROOT, partial, DEFAULT_GATHER_TAG)? else {
        return Ok(None);
    };

    let mut c = vec![Vec::new(); NRA];
    for block in blocks {
        for (i, row) in block.range().zip(block.items) {
            c[i] = row;
        }
    }
    Ok(Some(c))
}

fn report(c: &Matrix, started: Instant) {
    println!("******************************************************");
    println!("Result Matrix:");
    for row in c {
        let line: Vec<String> = row.iter().map(|v| format!("{v:6.2}")).collect();
        println!("{}", line.join("   "));
    }
    println!("******************************************************");
    println!("Time taken: {:.6} seconds", started.elapsed().as_secs_f64());
}

#[cfg(feature = "mpi-support")]
fn main() {
    let comm = match MpiComm::new() {
        Ok(comm) => comm,
        Err(e) => {
            eprintln!("MPI initialization failed: {e}");
            std::process::exit(1);
        }
    };
    let started = Instant::now();
    match run_rank(&comm) {
        Ok(Some(c)) => report(&c, started),
        Ok(None) => {}
        Err(e) => {
            eprintln!("[rank {}] row_blocks failed: {e}", comm.rank());
            std::process::exit(1);
        }
    }
}

#[cfg(not(feature = "mpi-support"))]
fn main() {
    let size = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(4);
    let started = Instant::now();
    let results = ThreadComm::run_group(ThreadComm::group(size), |comm| run_rank(&comm));
    for (rank, res) in results.into_iter().enumerate() {
        match res {
            Ok(Some(c)) => report(&c, started),
            Ok(None) => {}
            Err(e) => {
                eprintln!("[rank {rank}] row_blocks failed: {e}");
                std::process::exit(1);
            }
        }
    }
}
