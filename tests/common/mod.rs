// Shared fakes for the trait seams: a scripted capture device and a
// recording transport with failure injection.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use slu_client::{CaptureDevice, Error, ResponseSink, Result, StreamRequest, Transport};

/// Observable device state, shared with the test after the device moves
/// into the capture pipeline.
#[derive(Default)]
pub struct DeviceProbe {
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    pub closed: AtomicBool,
}

/// Capture device that yields a scripted block per poll. An empty scripted
/// block models a poll with zero samples available.
pub struct ScriptedDevice {
    blocks: Mutex<VecDeque<Vec<i16>>>,
    probe: Arc<DeviceProbe>,
}

impl ScriptedDevice {
    pub fn new(blocks: Vec<Vec<i16>>) -> Self {
        Self {
            blocks: Mutex::new(blocks.into()),
            probe: Arc::new(DeviceProbe::default()),
        }
    }

    pub fn probe(&self) -> Arc<DeviceProbe> {
        Arc::clone(&self.probe)
    }
}

impl CaptureDevice for ScriptedDevice {
    fn start(&mut self) -> Result<()> {
        self.probe.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) {
        self.probe.stops.fetch_add(1, Ordering::SeqCst);
    }

    fn available_samples(&self) -> usize {
        let mut blocks = self.blocks.lock().unwrap();
        match blocks.front() {
            Some(front) if front.is_empty() => {
                // A zero-sample poll consumes its scripted entry.
                blocks.pop_front();
                0
            }
            Some(front) => front.len(),
            None => 0,
        }
    }

    fn read_samples(&mut self, count: usize) -> Vec<i16> {
        let mut blocks = self.blocks.lock().unwrap();
        match blocks.pop_front() {
            Some(block) => {
                assert!(count <= block.len());
                block
            }
            None => Vec::new(),
        }
    }

    fn close(&mut self) {
        self.probe.closed.store(true, Ordering::SeqCst);
    }
}

/// Transport that records every outbound payload and replays a scripted
/// inbound queue; an exhausted queue reads as end-of-stream.
pub struct FakeTransport {
    sent: Mutex<Vec<Vec<u8>>>,
    inbound: tokio::sync::Mutex<VecDeque<Vec<u8>>>,
    fail_next_send: AtomicBool,
    pub flushes: AtomicUsize,
    pub closed: AtomicBool,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::with_inbound(Vec::new())
    }

    pub fn with_inbound(messages: Vec<serde_json::Value>) -> Self {
        let inbound = messages
            .into_iter()
            .map(|message| serde_json::to_vec(&message).unwrap())
            .collect();
        Self {
            sent: Mutex::new(Vec::new()),
            inbound: tokio::sync::Mutex::new(inbound),
            fail_next_send: AtomicBool::new(false),
            flushes: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    /// Make the next `send` fail with a connection error.
    pub fn inject_send_failure(&self) {
        self.fail_next_send.store(true, Ordering::SeqCst);
    }

    /// Everything sent so far, parsed back into requests.
    pub fn sent_requests(&self) -> Vec<StreamRequest> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|payload| serde_json::from_slice(payload).unwrap())
            .collect()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, payload: Vec<u8>) -> Result<()> {
        if self.fail_next_send.swap(false, Ordering::SeqCst) {
            return Err(Error::Connection("injected write failure".to_string()));
        }
        self.sent.lock().unwrap().push(payload);
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn next_inbound(&self) -> Option<Vec<u8>> {
        self.inbound.lock().await.pop_front()
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Sink that stores every forwarded response.
#[derive(Default)]
pub struct CollectingSink {
    pub messages: Mutex<Vec<serde_json::Value>>,
}

#[async_trait]
impl ResponseSink for CollectingSink {
    async fn on_response(&self, message: serde_json::Value) {
        self.messages.lock().unwrap().push(message);
    }
}
