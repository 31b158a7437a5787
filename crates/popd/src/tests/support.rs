//! Shared fixtures for supervisor tests.

use std::ffi::OsString;
use std::io::{self, Write};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use popd_config::ForwardedArgs;
use tracing_subscriber::fmt::MakeWriter;

use crate::diagnostics::Diagnostics;
use crate::dispatch::{ProtocolEngine, Session, ThreadDispatcher};
use crate::supervisor::{ControlFlags, Supervisor, SupervisorState};
use crate::trace::TraceSink;
use crate::transport::SocketListener;

pub(crate) const WAIT_TIMEOUT: Duration = Duration::from_secs(2);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub(crate) const GREETING: &[u8] = b"+OK popd test engine ready\r\n";

/// Engine that records each peer, greets it, and optionally crashes.
#[derive(Debug, Default)]
pub(crate) struct RecordingEngine {
    peers: Mutex<Vec<SocketAddr>>,
    sessions: AtomicUsize,
    crash_sessions: Mutex<Vec<usize>>,
}

impl RecordingEngine {
    pub(crate) fn crashing_on(sessions: &[usize]) -> Self {
        Self {
            crash_sessions: Mutex::new(sessions.to_vec()),
            ..Self::default()
        }
    }

    pub(crate) fn peers(&self) -> Vec<SocketAddr> {
        self.peers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn sessions(&self) -> usize {
        self.sessions.load(Ordering::SeqCst)
    }

    pub(crate) fn wait_for_sessions(&self, expected: usize) -> bool {
        wait_until(|| self.sessions() >= expected)
    }
}

impl ProtocolEngine for RecordingEngine {
    fn serve(&self, _args: &ForwardedArgs, session: Session) {
        let Session::Socket(mut stream) = session else {
            panic!("thread dispatch must hand the socket over directly");
        };
        let ordinal = self.sessions.fetch_add(1, Ordering::SeqCst);
        if let Ok(peer) = stream.peer_addr() {
            self.peers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(peer);
        }
        let crash = self
            .crash_sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&ordinal);
        assert!(!crash, "simulated engine crash in session {ordinal}");
        stream.write_all(GREETING).ok();
    }
}

pub(crate) type TestSupervisor = Supervisor<ThreadDispatcher<Arc<RecordingEngine>>>;

/// A supervisor bound to an ephemeral loopback port.
pub(crate) struct Harness {
    pub(crate) supervisor: TestSupervisor,
    pub(crate) engine: Arc<RecordingEngine>,
    pub(crate) flags: Arc<ControlFlags>,
    pub(crate) trace: TraceSink,
    pub(crate) addr: SocketAddrV4,
}

impl Harness {
    pub(crate) fn new(engine: RecordingEngine, trace: TraceSink) -> Self {
        let listener = SocketListener::bind(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0), false)
            .expect("bind loopback listener");
        let addr = listener.local_addr();
        let flags = Arc::new(ControlFlags::new());
        let args = Arc::new(ForwardedArgs::new(vec![
            OsString::from("popd"),
            OsString::from("-S"),
        ]));
        let state = SupervisorState::new(
            Arc::clone(&flags),
            args,
            Diagnostics::new("popd", trace.clone()),
        );
        let engine = Arc::new(engine);
        let dispatcher = ThreadDispatcher::new(Arc::clone(&engine));
        Self {
            supervisor: Supervisor::new(listener, state, dispatcher),
            engine,
            flags,
            trace,
            addr,
        }
    }

    pub(crate) fn connect(&self) -> TcpStream {
        let stream = TcpStream::connect(self.addr).expect("connect client");
        stream
            .set_read_timeout(Some(WAIT_TIMEOUT))
            .expect("set read timeout");
        stream
    }
}

/// Writes one line straight to the trace sink.
pub(crate) fn write_trace_line(trace: &TraceSink, line: &str) {
    let mut writer = trace.make_writer();
    writeln!(writer, "{line}").expect("write trace line");
}

pub(crate) fn open_trace(dir: &Path) -> (TraceSink, PathBuf) {
    let path = dir.join("pop.trace");
    let trace = TraceSink::open(&path).expect("open trace");
    (trace, path)
}

pub(crate) fn read_greeting(stream: &mut TcpStream) -> io::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    io::Read::read_to_end(stream, &mut buffer)?;
    Ok(buffer)
}

pub(crate) fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT_TIMEOUT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(POLL_INTERVAL);
    }
    condition()
}
