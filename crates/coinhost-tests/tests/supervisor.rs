//! Supervisor integration tests over fake node processes.
//!
//! All tests run on a paused clock, so sweep timing is virtual and exact.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use coinhost_core::params::{Coin, CoinNetwork, CoinNode};
use coinhost_daemon::{DaemonState, Supervisor, SupervisorConfig};
use coinhost_tests::helpers::FakeLauncher;

const SWEEP: Duration = Duration::from_millis(10);

fn config() -> SupervisorConfig {
    SupervisorConfig {
        sweep_interval: SWEEP,
        ..SupervisorConfig::default()
    }
}

fn add(sup: &Supervisor, network: CoinNetwork) -> u16 {
    sup.add_daemon(Coin::vertcoin(), CoinNode::vertcoind(), network)
        .unwrap()
}

/// Let `n` more sweeps run. Lands midway between two sweeps.
async fn sweeps(n: u32) {
    tokio::time::sleep(SWEEP * n + SWEEP / 2).await;
}

#[tokio::test(start_paused = true)]
async fn full_lifecycle() {
    let launcher = FakeLauncher::new();
    let sup = Arc::new(Supervisor::new(config(), launcher.clone()));
    let main = add(&sup, CoinNetwork::mainnet());
    let reg = add(&sup, CoinNetwork::regtest());
    assert_eq!((main, reg), (56200, 56201));

    let runner = {
        let sup = sup.clone();
        tokio::spawn(async move { sup.run().await })
    };
    sweeps(3).await;

    let states: Vec<DaemonState> = sup.daemons().iter().map(|d| d.state).collect();
    assert_eq!(states, vec![DaemonState::Running, DaemonState::Running]);

    // only the regtest daemon generates blocks
    assert_eq!(launcher.node(main).blocks.load(Ordering::SeqCst), 0);
    assert!(launcher.node(reg).blocks.load(Ordering::SeqCst) > 0);

    sup.stop().await.unwrap();
    runner.await.unwrap().unwrap();

    for port in [main, reg] {
        assert_eq!(launcher.node(port).stops(), 1);
        assert_eq!(launcher.node(port).starts(), 1);
    }
    assert!(sup.daemons().iter().all(|d| d.state == DaemonState::Stopped));
}

#[tokio::test(start_paused = true)]
async fn crashed_daemon_self_heals() {
    let launcher = FakeLauncher::new();
    let sup = Arc::new(Supervisor::new(config(), launcher.clone()));
    let port = add(&sup, CoinNetwork::testnet());

    let runner = {
        let sup = sup.clone();
        tokio::spawn(async move { sup.run().await })
    };
    sweeps(2).await;
    launcher.node(port).crash();
    sweeps(3).await;

    let status = &sup.daemons()[0];
    assert_eq!(status.state, DaemonState::Running);
    assert_eq!(status.restarts, 1);
    assert_eq!(launcher.node(port).starts(), 2);

    sup.stop().await.unwrap();
    runner.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn broken_daemon_is_retried_without_blocking_others() {
    let launcher = FakeLauncher::new();
    let sup = Arc::new(Supervisor::new(config(), launcher.clone()));
    let broken = add(&sup, CoinNetwork::mainnet());
    let healthy = add(&sup, CoinNetwork::testnet());
    launcher.node(broken).fail_start.store(true, Ordering::SeqCst);

    let runner = {
        let sup = sup.clone();
        tokio::spawn(async move { sup.run().await })
    };
    sweeps(4).await;

    assert!(launcher.node(broken).starts() >= 2, "retried on every sweep");
    assert_eq!(launcher.node(healthy).starts(), 1);
    let status = sup.daemons();
    assert_eq!(status[0].state, DaemonState::NotStarted);
    assert!(status[0].last_error.is_some());
    assert_eq!(status[1].state, DaemonState::Running);

    sup.stop().await.unwrap();
    runner.await.unwrap().unwrap();
    // stopped even though it never ran
    assert_eq!(launcher.node(broken).stops(), 1);
}

#[tokio::test(start_paused = true)]
async fn generate_failure_does_not_block_later_daemons() {
    let launcher = FakeLauncher::new();
    let sup = Arc::new(Supervisor::new(config(), launcher.clone()));
    let failing = add(&sup, CoinNetwork::regtest());
    let healthy = add(&sup, CoinNetwork::regtest());
    launcher.node(failing).fail_generate.store(true, Ordering::SeqCst);

    let runner = {
        let sup = sup.clone();
        tokio::spawn(async move { sup.run().await })
    };
    sweeps(2).await;

    // three sweeps so far: 0, 10 and 20 ms
    assert_eq!(launcher.node(failing).generate_attempts(), 3);
    assert_eq!(launcher.node(healthy).generate_attempts(), 3);
    assert_eq!(launcher.node(failing).blocks.load(Ordering::SeqCst), 0);
    assert_eq!(launcher.node(healthy).blocks.load(Ordering::SeqCst), 3);

    let status = sup.daemons();
    assert_eq!(status[0].state, DaemonState::Running);
    assert!(status[0].last_error.as_deref().unwrap().contains("connection refused"));
    assert_eq!(status[1].blocks_generated, 3);

    sup.stop().await.unwrap();
    runner.await.unwrap().unwrap();
    assert_eq!(launcher.node(failing).stops(), 1);
}
