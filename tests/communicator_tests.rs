use rank_scatter::algs::communicator::{CommError, CommTag, Communicator, NoComm, ThreadComm, Wait};

fn pair() -> (ThreadComm, ThreadComm) {
    let mut comms = ThreadComm::group(2);
    let c1 = comms.pop().unwrap();
    (comms.pop().unwrap(), c1)
}

#[test]
fn thread_round_trip() {
    let tag = CommTag(0x1000);
    let (c0, c1) = pair();

    let msg = b"hello";
    let _s = c0.isend(1, tag.as_u16(), msg);

    let h = c1.irecv(0, tag.as_u16());
    let got = h.wait().unwrap().unwrap();
    assert_eq!(&got, msg);
}

#[test]
fn thread_fifo_order() {
    let tag = CommTag(0x1001);
    let (c0, c1) = pair();

    for i in 0..10u8 {
        c0.send(1, tag.as_u16(), &[i]).unwrap();
    }
    let mut out = Vec::new();
    for _ in 0..10 {
        out.push(c1.recv(0, tag.as_u16()).unwrap()[0]);
    }
    assert_eq!(out, (0u8..10u8).collect::<Vec<_>>());
}

#[test]
fn receives_are_sized_by_the_message() {
    let tag = CommTag(0x1002);
    let (c0, c1) = pair();

    c0.send(1, tag.as_u16(), &[1, 2, 3, 4, 5, 6]).unwrap();
    c0.send(1, tag.as_u16(), &[]).unwrap();
    assert_eq!(c1.recv(0, tag.as_u16()).unwrap(), vec![1, 2, 3, 4, 5, 6]);
    assert!(c1.recv(0, tag.as_u16()).unwrap().is_empty());
}

#[test]
fn tag_isolation() {
    let (c0, c1) = pair();
    const TAG_A: u16 = 0xA100;
    const TAG_B: u16 = 0xB200;

    let rxa = c1.irecv(0, TAG_A);
    let rxb = c1.irecv(0, TAG_B);
    c0.send(1, TAG_B, &0x0123_4567_89AB_CDEFu64.to_le_bytes()).unwrap();
    c0.send(1, TAG_A, &0xDEAD_BEEF_F00D_F00Du64.to_le_bytes()).unwrap();

    let ra = rxa.wait().unwrap().expect("rxa");
    let rb = rxb.wait().unwrap().expect("rxb");
    assert_eq!(ra, 0xDEAD_BEEF_F00D_F00Du64.to_le_bytes());
    assert_eq!(rb, 0x0123_4567_89AB_CDEFu64.to_le_bytes());
}

#[test]
fn direction_matters() {
    let (c0, c1) = pair();
    // rank 0 sending to itself is not a message from rank 1
    c0.send(0, 5, &[1]).unwrap();
    let c1 = c1.with_timeout(std::time::Duration::from_millis(10));
    assert!(matches!(c1.recv(0, 5), Err(CommError::Timeout { .. })));
    assert_eq!(c0.recv(0, 5).unwrap(), vec![1]);
}

#[test]
fn no_comm_is_nop() {
    let comm = NoComm;
    assert!(comm.is_no_comm());
    let h = comm.irecv(0, 123);
    assert!(h.wait().unwrap().is_none());
    let s = comm.isend(0, 123, &[]);
    assert!(s.wait().unwrap().is_none());
}

#[test]
fn commtag_offset_wrap() {
    let t = CommTag::new(u16::MAX).offset(1);
    assert_eq!(t.as_u16(), 0);
}

#[cfg(feature = "mpi-support")]
#[serial_test::serial]
#[test]
fn mpi_comm_smoke_if_available() {
    use rank_scatter::algs::communicator::MpiComm;
    let world = MpiComm::new().expect("MPI initialization failed");
    let me = world.rank();
    let n = world.size();
    const TAG: u16 = 0xCAFE;
    let to = (me + 1) % n;
    let from = (me + n - 1) % n;
    let tx = [42u8, me as u8, 0, 0];
    let r = world.irecv(from, TAG);
    world.send(to, TAG, &tx).unwrap();
    let got = r.wait().expect("mpi rx").expect("mpi data");
    assert_eq!(got, [42u8, from as u8, 0, 0]);
}
