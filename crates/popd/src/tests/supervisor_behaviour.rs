//! Behavioural tests covering signal-driven rotation and shutdown.

use std::cell::RefCell;
use std::fs;
use std::net::TcpStream;
use std::path::PathBuf;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;

use crate::supervisor::LoopState;
use crate::tests::support::{Harness, RecordingEngine, open_trace, write_trace_line};

type StepResult = Result<(), String>;

const ROTATED_NAME: &str = "pop.trace.1";
const BEFORE_ROTATION: &str = "written before rotation";

struct SupervisorWorld {
    dir: TempDir,
    harness: Option<Harness>,
    trace_path: Option<PathBuf>,
    clients: Vec<TcpStream>,
    last_state: Option<LoopState>,
}

impl SupervisorWorld {
    fn new() -> Self {
        Self {
            dir: TempDir::new().expect("temp dir"),
            harness: None,
            trace_path: None,
            clients: Vec::new(),
            last_state: None,
        }
    }

    fn harness(&self) -> Result<&Harness, String> {
        self.harness
            .as_ref()
            .ok_or_else(|| String::from("supervisor has not been created"))
    }

    fn harness_mut(&mut self) -> Result<&mut Harness, String> {
        self.harness
            .as_mut()
            .ok_or_else(|| String::from("supervisor has not been created"))
    }

    fn trace_path(&self) -> Result<&PathBuf, String> {
        self.trace_path
            .as_ref()
            .ok_or_else(|| String::from("trace file has not been opened"))
    }

    fn rotated_path(&self) -> PathBuf {
        self.dir.path().join(ROTATED_NAME)
    }

    fn connect(&mut self) -> StepResult {
        let client = self.harness()?.connect();
        self.clients.push(client);
        Ok(())
    }

    fn step(&mut self) -> StepResult {
        let state = self
            .harness_mut()?
            .supervisor
            .step()
            .map_err(|error| error.to_string())?;
        self.last_state = Some(state);
        Ok(())
    }
}

#[fixture]
fn world() -> RefCell<SupervisorWorld> {
    RefCell::new(SupervisorWorld::new())
}

#[given("a supervisor with an open trace file")]
fn given_supervisor(world: &RefCell<SupervisorWorld>) {
    let mut world = world.borrow_mut();
    let (trace, path) = open_trace(world.dir.path());
    write_trace_line(&trace, BEFORE_ROTATION);
    world.harness = Some(Harness::new(RecordingEngine::default(), trace));
    world.trace_path = Some(path);
}

#[given("the trace file has been renamed by a rotation tool")]
fn given_trace_renamed(world: &RefCell<SupervisorWorld>) -> StepResult {
    let world = world.borrow();
    fs::rename(world.trace_path()?, world.rotated_path()).map_err(|error| error.to_string())
}

#[when("a reload is requested")]
fn when_reload_requested(world: &RefCell<SupervisorWorld>) -> StepResult {
    world.borrow().harness()?.flags.request_rotation();
    Ok(())
}

#[when("a shutdown is requested")]
fn when_shutdown_requested(world: &RefCell<SupervisorWorld>) -> StepResult {
    world.borrow().harness()?.flags.request_shutdown();
    Ok(())
}

#[when("a client connects")]
fn when_client_connects(world: &RefCell<SupervisorWorld>) -> StepResult {
    world.borrow_mut().connect()
}

#[when("{count} clients connect")]
fn when_clients_connect(world: &RefCell<SupervisorWorld>, count: usize) -> StepResult {
    let mut world = world.borrow_mut();
    for _ in 0..count {
        world.connect()?;
    }
    Ok(())
}

#[when("the loop runs one iteration")]
fn when_loop_runs_once(world: &RefCell<SupervisorWorld>) -> StepResult {
    world.borrow_mut().step()
}

#[when("the loop runs {count} iterations")]
fn when_loop_runs(world: &RefCell<SupervisorWorld>, count: usize) -> StepResult {
    for _ in 0..count {
        world.borrow_mut().step()?;
    }
    Ok(())
}

#[then("the rotation flag is cleared")]
fn then_rotation_cleared(world: &RefCell<SupervisorWorld>) -> StepResult {
    let world = world.borrow();
    let flags = &world.harness()?.flags;
    if flags.rotation_requested() {
        return Err(String::from("rotation flag is still set"));
    }
    if !flags.reload_armed() {
        return Err(String::from("reload handler was not re-armed"));
    }
    Ok(())
}

#[then("the trace file is reopened at the same path")]
fn then_trace_reopened(world: &RefCell<SupervisorWorld>) -> StepResult {
    let world = world.borrow();
    let harness = world.harness()?;
    write_trace_line(&harness.trace, "written after rotation");
    let content = fs::read_to_string(world.trace_path()?).map_err(|error| error.to_string())?;
    if content == "written after rotation\n" {
        Ok(())
    } else {
        Err(format!("unexpected reopened trace content: {content:?}"))
    }
}

#[then("the renamed trace file keeps its contents")]
fn then_renamed_trace_kept(world: &RefCell<SupervisorWorld>) -> StepResult {
    let world = world.borrow();
    let content = fs::read_to_string(world.rotated_path()).map_err(|error| error.to_string())?;
    if content.contains(BEFORE_ROTATION) {
        Ok(())
    } else {
        Err(format!("renamed trace lost its content: {content:?}"))
    }
}

#[then("the loop is shutting down")]
fn then_loop_shutting_down(world: &RefCell<SupervisorWorld>) -> StepResult {
    let world = world.borrow();
    let harness = world.harness()?;
    if world.last_state != Some(LoopState::ShuttingDown) {
        return Err(format!("loop state is {:?}", world.last_state));
    }
    if harness.supervisor.listener().is_some() {
        return Err(String::from("listener is still open"));
    }
    if harness.trace.is_open() {
        return Err(String::from("trace sink is still open"));
    }
    Ok(())
}

#[then("the trace file was not reopened")]
fn then_trace_not_reopened(world: &RefCell<SupervisorWorld>) -> StepResult {
    let world = world.borrow();
    if world.trace_path()?.exists() {
        return Err(String::from("trace file was recreated"));
    }
    if !world.harness()?.flags.rotation_requested() {
        return Err(String::from("pending rotation was consumed"));
    }
    Ok(())
}

#[then("the engine served {count} connections")]
fn then_engine_served(world: &RefCell<SupervisorWorld>, count: usize) -> StepResult {
    let world = world.borrow();
    let harness = world.harness()?;
    if !harness.engine.wait_for_sessions(count) {
        return Err(format!(
            "engine served {} of {count} connections",
            harness.engine.sessions()
        ));
    }
    let peers = harness.engine.peers();
    for client in &world.clients {
        let local = client.local_addr().map_err(|error| error.to_string())?;
        if !peers.contains(&local) {
            return Err(format!("client {local} was never served"));
        }
    }
    Ok(())
}

#[scenario(
    path = "tests/features/supervisor.feature",
    name = "A reload reopens the trace file at its configured path"
)]
fn reload_reopens_trace(world: RefCell<SupervisorWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/supervisor.feature",
    name = "Shutdown takes priority over a pending reload"
)]
fn shutdown_beats_reload(world: RefCell<SupervisorWorld>) {
    drop(world);
}

#[scenario(
    path = "tests/features/supervisor.feature",
    name = "Every queued client is served"
)]
fn queued_clients_served(world: RefCell<SupervisorWorld>) {
    drop(world);
}
