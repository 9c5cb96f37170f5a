// demos/scatter_squares.rs
// cargo mpirun -n 4 --features mpi-support --example scatter_squares
// cargo run --example scatter_squares -- 4
//
// Rank 0 builds the squares [1, 4, 9, ...], one per rank, and scatters them.
// Every rank prints the value it received. Without `mpi-support` the ranks are
// threads sharing one process; the rank count is the first argument.

use rank_scatter::prelude::*;

fn squares(size: usize) -> Vec<u64> {
    (1..=size as u64).map(|i| i * i).collect()
}

fn run_rank<C: Communicator>(comm: &C) -> Result<(), ScatterError> {
    let rank = comm.rank();
    let input = if rank == 0 {
        RootInput::Payload(squares(comm.size()))
    } else {
        RootInput::NonRoot
    };
    let data: u64 = scatter(comm, 0, input, &ScatterConfig::default())?;
    println!("Process {rank} received data: {data}");
    Ok(())
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
    if let Err(e) = run_rank(&comm) {
        eprintln!("[rank {}] scatter failed: {e}", comm.rank());
        std::process::exit(1);
    }
}

#[cfg(not(feature = "mpi-support"))]
fn main() {
    let size = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(4);
    let results = ThreadComm::run_group(ThreadComm::group(size), |comm| run_rank(&comm));
    for (rank, res) in results.into_iter().enumerate() {
        if let Err(e) = res {
            eprintln!("[rank {rank}] scatter failed: {e}");
            std::process::exit(1);
        }
    }
}
