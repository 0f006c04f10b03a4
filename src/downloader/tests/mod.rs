//! Downloader integration tests running real queues against fake
//! collaborators.

mod lifecycle;

use std::time::Duration;

use tokio::sync::broadcast::Receiver;

use crate::types::Event;

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Receive the next event or panic after a timeout.
async fn next_event(rx: &mut Receiver<Event>) -> Event {
    tokio::time::timeout(EVENT_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("event channel closed")
}

/// Whether `event` is the terminal event of the task for `video_id`.
fn is_terminal_for(event: &Event, video_id: &str) -> bool {
    match event {
        Event::TaskFailed { video_id: id, .. } => id == video_id,
        Event::TaskFinished { result } => result.video_id == video_id,
        _ => false,
    }
}

/// Whether `event` is any task's terminal event.
fn is_terminal(event: &Event) -> bool {
    matches!(event, Event::TaskFailed { .. } | Event::TaskFinished { .. })
}

/// Collect events until the task for `video_id` reaches its terminal state.
async fn events_until_terminal(rx: &mut Receiver<Event>, video_id: &str) -> Vec<Event> {
    let mut events = Vec::new();
    loop {
        let event = next_event(rx).await;
        let done = is_terminal_for(&event, video_id);
        events.push(event);
        if done {
            return events;
        }
    }
}

/// Collect events until `n` terminal events have been observed.
async fn events_until_terminals(rx: &mut Receiver<Event>, n: usize) -> Vec<Event> {
    let mut events = Vec::new();
    let mut terminals = 0;
    while terminals < n {
        let event = next_event(rx).await;
        if is_terminal(&event) {
            terminals += 1;
        }
        events.push(event);
    }
    events
}

/// Drain whatever is still buffered, waiting briefly for stragglers.
async fn drain(rx: &mut Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(Ok(event)) = tokio::time::timeout(Duration::from_millis(300), rx.recv()).await {
        events.push(event);
    }
    events
}
