//! Integration tests for the background classifier worker and the drawing session.
//!
//! Tests cover:
//! - Requests before, during and after initialization
//! - Submission-order execution
//! - Graceful close behind in-flight work
//! - End-to-end detect from surface events

mod common;

use common::*;
use std::time::Duration;

#[tokio::test]
async fn test_classify_before_ready_fails_fast() -> anyhow::Result<()> {
    let (engine, release) = FakeEngine::with_scores(&EXAMPLE_SCORES).gated();
    let (worker, probe) = spawn_worker(engine);

    assert_eq!(worker.status(), WorkerStatus::Initializing);
    assert!(!worker.is_ready());
    assert_eq!(worker.classify(blank_pixels()).await, Err(ClassifyError::NotReady));
    assert!(matches!(worker.submit(blank_pixels()), Err(ClassifyError::NotReady)));

    release.send(())?;
    worker.wait_ready().await?;
    assert!(worker.is_ready());

    let results = worker.classify(blank_pixels()).await?;
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].id, "1");
    assert_eq!(probe.calls(), 1);

    worker.close().await;
    Ok(())
}

#[tokio::test]
async fn test_failed_initialization_is_reported() {
    let (worker, _) = spawn_worker(FakeEngine::failing_init());

    let err = worker.wait_ready().await.unwrap_err();
    assert!(matches!(err, ClassifyError::Initialization(ref msg) if msg.contains("corrupt")));
    assert!(matches!(worker.status(), WorkerStatus::Failed(_)));
    assert!(matches!(
        worker.classify(blank_pixels()).await,
        Err(ClassifyError::Initialization(_))
    ));

    worker.close().await;
    assert_eq!(worker.status(), WorkerStatus::Closed);
}

#[tokio::test]
async fn test_crashed_initialization_still_resolves() {
    let (worker, probe) = spawn_worker(FakeEngine::panicking_init());

    let outcome = tokio::time::timeout(Duration::from_secs(5), worker.wait_ready()).await;
    let err = outcome.expect("wait_ready hung after the worker thread died").unwrap_err();
    assert!(matches!(err, ClassifyError::Initialization(_)));
    assert!(matches!(worker.submit(blank_pixels()), Err(ref e) if *e == err));

    let closed = tokio::time::timeout(Duration::from_secs(5), worker.close()).await;
    assert!(closed.is_ok());
    assert_eq!(worker.status(), WorkerStatus::Closed);
    // Closing again returns at once
    worker.close().await;
    assert_eq!(probe.calls(), 0);
}

#[tokio::test]
async fn test_wrong_length_never_reaches_engine() -> anyhow::Result<()> {
    let (worker, probe) = spawn_worker(FakeEngine::with_scores(&EXAMPLE_SCORES));
    worker.wait_ready().await?;

    let err = worker.classify(vec![0.0; 10]).await.unwrap_err();
    assert_eq!(err, ClassifyError::InvalidInput { expected: 784, actual: 10 });
    assert_eq!(probe.calls(), 0);

    worker.close().await;
    Ok(())
}

#[tokio::test]
async fn test_jobs_run_in_submission_order() -> anyhow::Result<()> {
    let engine = FakeEngine::with_scores(&EXAMPLE_SCORES).with_delay(Duration::from_millis(5));
    let (worker, probe) = spawn_worker(engine);
    worker.wait_ready().await?;

    let pending: Vec<_> = (1..=5)
        .map(|tag| worker.submit(tagged_pixels(tag as f32)))
        .collect::<Result<_, _>>()?;

    for result in pending {
        assert_eq!(result.await?.map(|r| r.len()), Ok(3));
    }
    assert_eq!(probe.first_pixels(), vec![1.0, 2.0, 3.0, 4.0, 5.0]);

    worker.close().await;
    Ok(())
}

#[tokio::test]
async fn test_close_waits_for_in_flight_classification() -> anyhow::Result<()> {
    let engine = FakeEngine::with_scores(&EXAMPLE_SCORES).with_delay(Duration::from_millis(50));
    let (worker, probe) = spawn_worker(engine);
    worker.wait_ready().await?;

    let pending = worker.submit(blank_pixels())?;
    worker.close().await;

    // The queued call completed before the engine was released
    let results = pending.await?;
    assert_eq!(results.map(|r| r.len()), Ok(3));
    assert_eq!(probe.calls(), 1);
    assert!(probe.is_closed());
    assert_eq!(worker.status(), WorkerStatus::Closed);

    assert_eq!(worker.classify(blank_pixels()).await, Err(ClassifyError::Closed));

    // Closing twice is harmless
    worker.close().await;
    Ok(())
}

#[tokio::test]
async fn test_close_before_initialization_completes() -> anyhow::Result<()> {
    let (engine, release) = FakeEngine::with_scores(&EXAMPLE_SCORES).gated();
    let (worker, probe) = spawn_worker(engine);

    // join! polls close first, so the close request lands while the model is still loading
    tokio::join!(worker.close(), async {
        release.send(()).ok();
    });

    assert_eq!(worker.status(), WorkerStatus::Closed);
    assert!(probe.is_closed());
    assert_eq!(worker.wait_ready().await, Err(ClassifyError::Closed));
    Ok(())
}

#[test]
fn test_blocking_shutdown_outside_runtime() {
    let (worker, probe) = spawn_worker(FakeEngine::with_scores(&EXAMPLE_SCORES));
    worker.shutdown();
    assert!(probe.is_closed());
}

#[tokio::test]
async fn test_dropping_the_worker_releases_the_engine() -> anyhow::Result<()> {
    let (worker, probe) = spawn_worker(FakeEngine::with_scores(&EXAMPLE_SCORES));
    worker.wait_ready().await?;
    drop(worker);

    for _ in 0..100 {
        if probe.is_closed() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(probe.is_closed());
    Ok(())
}

fn session_with(engine: FakeEngine) -> (DrawingSession, EngineProbe) {
    let (worker, probe) = spawn_worker(engine);
    let canvas = StrokeCanvas::new(&CanvasConfig::default());
    // A 1080px touch surface over the 280-unit canvas
    let mapping = SurfaceMapping::new((1080.0, 1080.0), (280.0, 280.0));
    (DrawingSession::new(canvas, mapping, worker), probe)
}

#[tokio::test]
async fn test_session_detect_from_surface_events() -> anyhow::Result<()> {
    let (mut session, probe) = session_with(FakeEngine::with_scores(&EXAMPLE_SCORES));
    session.worker().wait_ready().await?;

    assert!(session.handle_event(SurfaceEvent::Down { x: 540.0, y: 108.0 }));
    assert!(session.handle_event(SurfaceEvent::Move { x: 540.0, y: 540.0 }));
    assert!(session.handle_event(SurfaceEvent::Move { x: 540.0, y: 972.0 }));
    assert!(session.handle_event(SurfaceEvent::Up));
    assert!(!session.handle_event(SurfaceEvent::Move { x: 0.0, y: 0.0 }));

    let strokes = &session.canvas().drawing().strokes;
    assert_eq!(strokes.len(), 1);
    assert_eq!(strokes[0].points[0], digitsketch::Point::new(140.0, 28.0));

    let results = session.detect().await?;
    assert_eq!(results.len(), 3);
    let location = results[0].location.expect("detect attaches ink bounds");
    assert_eq!(location.x, 140.0);
    assert_eq!(location.y, 28.0);
    assert_eq!(location.height, 224.0);

    // The engine saw the rasterized drawing, and detect left the strokes alone
    assert_eq!(probe.calls(), 1);
    assert_eq!(session.canvas().stroke_count(), 1);
    assert!(!session.rasterize().is_blank());

    session.clear();
    assert!(session.rasterize().is_blank());
    let results = session.detect().await?;
    assert!(results.iter().all(|r| r.location.is_none()));

    session.close().await;
    assert!(probe.is_closed());
    Ok(())
}

#[tokio::test]
async fn test_session_replay_matches_live_input() -> anyhow::Result<()> {
    let (mut live, _) = session_with(FakeEngine::with_scores(&EXAMPLE_SCORES));
    live.resize_surface(280.0, 280.0);
    live.handle_event(SurfaceEvent::Down { x: 60.0, y: 60.0 });
    live.handle_event(SurfaceEvent::Move { x: 200.0, y: 220.0 });
    live.handle_event(SurfaceEvent::Up);

    let (mut replayed, _) = session_with(FakeEngine::with_scores(&EXAMPLE_SCORES));
    replayed.replay(live.canvas().drawing());

    assert_eq!(live.rasterize(), replayed.rasterize());

    live.close().await;
    replayed.close().await;
    Ok(())
}
