//! End-to-end behavior of task graphs running over live runners.

use std::panic;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use foundation_tasks::errors::TaskError;
use foundation_tasks::runners::{Runner, RunnerScope};
use foundation_tasks::tasks::{
    conditional, conditional_only, gate, getter, handle, handle_any, intercept, loop_while,
    mutator, repeat, sequence, simple, Failure,
};

const WAIT: Duration = Duration::from_secs(5);

fn runner() -> Arc<Runner> {
    Arc::new(Runner::new().expect("runner should build"))
}

#[test]
fn simple_task_invokes_the_callable_once_on_a_pool_thread() {
    let scope = runner();
    let calls = Arc::new(AtomicUsize::new(0));
    let (sender, receiver) = mpsc::channel();

    let counted = Arc::clone(&calls);
    let task = simple(&scope, move |_, input: i32| {
        counted.fetch_add(1, Ordering::SeqCst);
        let name = thread::current().name().map(str::to_owned);
        sender.send((input, name)).expect("observer should be alive");
    });

    task.run(5);

    let (input, name) = receiver.recv_timeout(WAIT).expect("task should run");
    assert_eq!(input, 5);
    assert!(name.expect("pool threads are named").starts_with("task-pool-"));

    thread::sleep(Duration::from_millis(100));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn tasks_on_one_sequential_runner_keep_submission_order() {
    let scope = runner();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let (sender, receiver) = mpsc::channel();

    let slow_seen = Arc::clone(&seen);
    let slow = simple(&scope, move |_, ()| {
        // give the second task every chance to overtake if ordering broke.
        thread::sleep(Duration::from_millis(80));
        slow_seen.lock().unwrap().push("first");
    });

    let fast_seen = Arc::clone(&seen);
    let fast = simple(&scope, move |_, ()| {
        fast_seen.lock().unwrap().push("second");
        sender.send(()).expect("observer should be alive");
    });

    slow.launch();
    fast.launch();

    receiver.recv_timeout(WAIT).expect("both tasks should run");
    assert_eq!(*seen.lock().unwrap(), vec!["first", "second"]);
}

#[test]
fn sequence_threads_each_result_into_the_next_stage() {
    let scope = runner();
    let (sender, receiver) = mpsc::channel();

    let add_one = simple(&scope, |_, x: i32| x + 1);
    let add_two = simple(&scope, |_, x: i32| x + 2);
    let store = mutator(&scope, move |_, x: i32| {
        sender.send(x).expect("observer should be alive");
    });

    let chain = sequence(add_one, add_two).then(store);
    chain.run(5);

    assert_eq!(receiver.recv_timeout(WAIT), Ok(8));
}

#[test]
fn conditional_runs_exactly_one_branch() {
    let scope = runner();
    let (sender, receiver) = mpsc::channel();

    let build = |sender: mpsc::Sender<i32>| {
        let predicate = simple(&scope, |_, x: i32| x == 5);
        let on_true = simple(&scope, |_, x: i32| x + 42);
        let on_false = simple(&scope, |_, x: i32| x + 84);
        let store = mutator(&scope, move |_, x: i32| {
            sender.send(x).expect("observer should be alive");
        });
        conditional(predicate, on_true, on_false).then(store)
    };

    let decide = build(sender);
    decide.run(5);
    assert_eq!(receiver.recv_timeout(WAIT), Ok(47));

    decide.run(10);
    assert_eq!(receiver.recv_timeout(WAIT), Ok(94));
}

#[test]
fn false_predicate_without_else_runs_no_branch() {
    let scope = runner();
    let branch_calls = Arc::new(AtomicUsize::new(0));
    let (sender, receiver) = mpsc::channel();

    let counted = Arc::clone(&branch_calls);
    let predicate = simple(&scope, |_, x: i32| x > 0);
    let on_true = mutator(&scope, move |_, _: i32| {
        counted.fetch_add(1, Ordering::SeqCst);
    });
    let done = mutator(&scope, move |_, (): ()| {
        sender.send(()).expect("observer should be alive");
    });

    conditional_only(predicate, on_true).then(done).run(-3);

    receiver.recv_timeout(WAIT).expect("composition should finish");
    assert_eq!(branch_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn repeat_feeds_the_counter_in_order() {
    let scope = runner();
    let inputs = Arc::new(Mutex::new(Vec::new()));
    let (sender, receiver) = mpsc::channel();

    let recorded = Arc::clone(&inputs);
    let body = mutator(&scope, move |_, counter: u64| {
        recorded.lock().unwrap().push(counter);
    });
    let done = mutator(&scope, move |_, (): ()| {
        sender.send(()).expect("observer should be alive");
    });

    repeat(body).then(done).run(100);

    receiver.recv_timeout(WAIT).expect("repeat should finish");
    let seen = inputs.lock().unwrap().clone();
    assert_eq!(seen, (0..100).collect::<Vec<u64>>());
}

#[test]
fn repeat_of_zero_never_runs_the_body() {
    let scope = runner();
    let calls = Arc::new(AtomicUsize::new(0));
    let (sender, receiver) = mpsc::channel();

    let counted = Arc::clone(&calls);
    let body = mutator(&scope, move |_, _: u64| {
        counted.fetch_add(1, Ordering::SeqCst);
    });
    let done = mutator(&scope, move |_, (): ()| {
        sender.send(()).expect("observer should be alive");
    });

    repeat(body).then(done).run(0);

    receiver.recv_timeout(WAIT).expect("repeat should finish");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn loop_runs_the_body_until_the_predicate_drops() {
    let scope = runner();
    let predicate_calls = Arc::new(AtomicUsize::new(0));
    let body_calls = Arc::new(AtomicUsize::new(0));
    let (sender, receiver) = mpsc::channel();

    let predicate_counted = Arc::clone(&predicate_calls);
    let predicate = simple(&scope, move |_, x: i32| {
        predicate_counted.fetch_add(1, Ordering::SeqCst);
        x < 100
    });

    let body_counted = Arc::clone(&body_calls);
    let body = simple(&scope, move |_, x: i32| {
        body_counted.fetch_add(1, Ordering::SeqCst);
        x + 1
    });

    let store = mutator(&scope, move |_, x: i32| {
        sender.send(x).expect("observer should be alive");
    });

    loop_while(predicate, body).then(store).run(0);

    assert_eq!(receiver.recv_timeout(WAIT), Ok(100));
    assert_eq!(body_calls.load(Ordering::SeqCst), 100);
    assert_eq!(predicate_calls.load(Ordering::SeqCst), 101);
}

#[test]
fn loop_with_an_immediately_false_predicate_returns_the_input() {
    let scope = runner();
    let body_calls = Arc::new(AtomicUsize::new(0));
    let (sender, receiver) = mpsc::channel();

    let predicate = simple(&scope, |_, _: i32| false);
    let counted = Arc::clone(&body_calls);
    let body = simple(&scope, move |_, x: i32| {
        counted.fetch_add(1, Ordering::SeqCst);
        x + 1
    });
    let store = mutator(&scope, move |_, x: i32| {
        sender.send(x).expect("observer should be alive");
    });

    loop_while(predicate, body).then(store).run(42);

    assert_eq!(receiver.recv_timeout(WAIT), Ok(42));
    assert_eq!(body_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn body_less_gate_polls_the_predicate_until_false() {
    let scope = runner();
    let polls = Arc::new(AtomicUsize::new(0));
    let (sender, receiver) = mpsc::channel();

    let counted = Arc::clone(&polls);
    let predicate = simple(&scope, move |_, ()| {
        counted.fetch_add(1, Ordering::SeqCst) + 1 < 3
    });
    let done = mutator(&scope, move |_, (): ()| {
        sender.send(()).expect("observer should be alive");
    });

    gate(predicate).then(done).launch();

    receiver.recv_timeout(WAIT).expect("gate should finish");
    assert_eq!(polls.load(Ordering::SeqCst), 3);
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct DemoFault(&'static str);

#[test]
fn intercept_routes_a_fault_to_the_typed_handler() {
    let scope = runner();
    let any_calls = Arc::new(AtomicUsize::new(0));
    let (sender, receiver) = mpsc::channel();

    let attempt = simple(&scope, |_, x: i32| {
        if x == 5 {
            panic::panic_any(DemoFault("oops"));
        }
        x
    });

    let typed = simple(&scope, |_, fault: DemoFault| {
        assert_eq!(fault, DemoFault("oops"));
        -1
    });

    let counted = Arc::clone(&any_calls);
    let catch_all = simple(&scope, move |_, _: Failure| {
        counted.fetch_add(1, Ordering::SeqCst);
        -2
    });

    let store = mutator(&scope, move |_, x: i32| {
        sender.send(x).expect("observer should be alive");
    });

    let guarded = intercept(attempt, handle::<DemoFault, _, _>(typed))
        .or_handle(handle_any(catch_all))
        .then(store);

    guarded.run(5);
    assert_eq!(receiver.recv_timeout(WAIT), Ok(-1));
    assert_eq!(any_calls.load(Ordering::SeqCst), 0);

    guarded.run(6);
    assert_eq!(receiver.recv_timeout(WAIT), Ok(6));
}

#[test]
fn an_unmatched_fault_escapes_the_intercept_unchanged() {
    let scope = runner();
    let (sender, receiver) = mpsc::channel();

    let attempt = simple(&scope, |_, ()| {
        panic::panic_any(DemoFault("escaped"));
    });

    // the inner intercept only understands strings; the demo fault must
    // pass it untouched and reach the outer catch-all.
    let unrelated = simple(&scope, |_, _: String| ());
    let inner = intercept(attempt, handle::<String, _, _>(unrelated));

    let observed = mutator(&scope, move |_, failure: Failure| {
        let fault = failure
            .downcast::<DemoFault>()
            .expect("the original payload should survive the inner intercept");
        sender.send(fault).expect("observer should be alive");
    });
    let outer = intercept(inner, handle_any(observed));

    outer.launch();

    assert_eq!(
        receiver.recv_timeout(WAIT),
        Ok(DemoFault("escaped"))
    );
}

#[test]
fn a_faulting_stage_short_circuits_the_rest_of_a_sequence() {
    let scope = runner();
    let later_calls = Arc::new(AtomicUsize::new(0));
    let (sender, receiver) = mpsc::channel();

    let explode = simple(&scope, |_, _x: i32| -> i32 {
        panic::panic_any(DemoFault("mid-chain"))
    });

    let counted = Arc::clone(&later_calls);
    let never = simple(&scope, move |_, x: i32| {
        counted.fetch_add(1, Ordering::SeqCst);
        x
    });

    let observed = mutator(&scope, move |_, failure: Failure| {
        sender
            .send(failure.is::<DemoFault>())
            .expect("observer should be alive");
    });

    intercept(sequence(explode, never), handle_any(observed)).run(1);

    assert_eq!(receiver.recv_timeout(WAIT), Ok(true));
    assert_eq!(later_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn a_dropped_runner_surfaces_as_runner_unavailable() {
    let live = runner();
    let calls = Arc::new(AtomicUsize::new(0));
    let (sender, receiver) = mpsc::channel();

    let counted = Arc::clone(&calls);
    let doomed = {
        let dying = runner();
        simple(&dying, move |_, ()| {
            counted.fetch_add(1, Ordering::SeqCst);
        })
        // `dying` drops here; the task keeps only a weak reference.
    };

    let observed = mutator(&live, move |_, error: TaskError| {
        sender
            .send(matches!(error, TaskError::RunnerUnavailable))
            .expect("observer should be alive");
    });

    intercept(doomed, handle::<TaskError, _, _>(observed)).launch();

    assert_eq!(receiver.recv_timeout(WAIT), Ok(true));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn a_stopped_runner_holds_tasks_and_replays_them_in_order() {
    let scope = runner();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let (sender, receiver) = mpsc::channel();

    scope.stop();

    for index in 0..3i32 {
        let recorded = Arc::clone(&seen);
        let sender = sender.clone();
        simple(&scope, move |_, ()| {
            recorded.lock().unwrap().push(index);
            sender.send(index).expect("observer should be alive");
        })
        .launch();
    }

    assert!(receiver.recv_timeout(Duration::from_millis(200)).is_err());
    assert!(seen.lock().unwrap().is_empty());

    scope.start();
    for _ in 0..3 {
        receiver.recv_timeout(WAIT).expect("tasks should replay");
    }
    assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
}

#[test]
fn a_sleeping_stage_on_another_runner_does_not_block_the_first() {
    let first = runner();
    let second = runner();
    let (started_sender, started) = mpsc::channel();
    let (probe_sender, probed) = mpsc::channel();
    let (finished_sender, finished) = mpsc::channel();

    let opening = simple(&first, move |_, x: i32| {
        started_sender.send(()).expect("observer should be alive");
        x
    });
    let sleeper = simple(&second, |_, x: i32| {
        thread::sleep(Duration::from_millis(500));
        x
    });
    let closing = mutator(&first, move |_, _: i32| {
        finished_sender
            .send(Instant::now())
            .expect("observer should be alive");
    });

    sequence(opening, sleeper).then(closing).run(0);

    started.recv_timeout(WAIT).expect("the chain should start");

    // while the chain sleeps on the second runner, the first runner must
    // stay available for unrelated work.
    simple(&first, move |_, ()| {
        probe_sender
            .send(Instant::now())
            .expect("observer should be alive");
    })
    .launch();

    let probe_done = probed
        .recv_timeout(Duration::from_millis(400))
        .expect("the probe should run inside the sleep window");
    let chain_done = finished.recv_timeout(WAIT).expect("the chain should finish");
    assert!(probe_done < chain_done);
}

struct Tracked {
    value: i32,
}

static TRACKED_LIVE: AtomicUsize = AtomicUsize::new(0);

impl Tracked {
    fn new(value: i32) -> Self {
        TRACKED_LIVE.fetch_add(1, Ordering::SeqCst);
        Self { value }
    }
}

impl Clone for Tracked {
    fn clone(&self) -> Self {
        Self::new(self.value)
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        TRACKED_LIVE.fetch_sub(1, Ordering::SeqCst);
    }
}

#[test]
fn payloads_moving_through_a_graph_are_all_released() {
    let scope = runner();
    let (sender, receiver) = mpsc::channel();

    let predicate = simple(&scope, |_, tracked: Tracked| tracked.value < 3);
    let body = simple(&scope, |_, tracked: Tracked| Tracked::new(tracked.value + 1));
    let store = mutator(&scope, move |_, tracked: Tracked| {
        sender.send(tracked.value).expect("observer should be alive");
    });

    loop_while(predicate, body).then(store).run(Tracked::new(0));

    assert_eq!(receiver.recv_timeout(WAIT), Ok(3));

    // the stack tears down right after the final mutator reports; give
    // the worker a moment to drop the remnants.
    let deadline = Instant::now() + WAIT;
    loop {
        if TRACKED_LIVE.load(Ordering::SeqCst) == 0 {
            break;
        }
        assert!(Instant::now() < deadline, "payloads leaked");
        thread::sleep(Duration::from_millis(10));
    }
}

struct CounterScope {
    runner: Runner,
    hits: AtomicUsize,
}

impl RunnerScope for CounterScope {
    fn runner(&self) -> &Runner {
        &self.runner
    }
}

#[test]
fn getter_and_mutator_see_the_concrete_scope() {
    let scope = Arc::new(CounterScope {
        runner: Runner::new().expect("runner should build"),
        hits: AtomicUsize::new(0),
    });
    let (sender, receiver) = mpsc::channel();

    let bump = mutator(&scope, |scope: &Arc<CounterScope>, amount: usize| {
        scope.hits.fetch_add(amount, Ordering::SeqCst);
    });
    let read = getter(&scope, |scope: &Arc<CounterScope>| {
        scope.hits.load(Ordering::SeqCst)
    });
    let store = mutator(&scope, move |_, hits: usize| {
        sender.send(hits).expect("observer should be alive");
    });

    bump.then(read).then(store).run(4);

    assert_eq!(receiver.recv_timeout(WAIT), Ok(4));
}

#[test]
fn clones_of_a_task_handle_share_the_descriptor() {
    let scope = runner();
    let task = simple(&scope, |_, x: i32| x);
    let clone = task.clone();
    assert_eq!(task.id(), clone.id());
    assert_eq!(task.name(), clone.name());
    assert!(task.name().starts_with("task-"));
}
