//! # tickloop Example Firmware
//!
//! A small STM32F4 application wired the way a real one would be:
//!
//! | Task | Kind | Behavior |
//! |------|------|----------|
//! | `console` | Event (16 slots) | Consumes bytes; ESC (`0x1B`) aborts the current line |
//! | `sampler` | Event (4 slots), run-on-init | Re-arms its own 50 ms timer on every timeout |
//! | `heartbeat` | Continuous, 500 ms | Posts a status byte to `console` |
//! | `watchdog_kick` | One-shot, 2 s | Re-enables itself so it keeps firing |
//!
//! One tick task, `scan_keys`, runs from SysTick every 10 ticks and posts a
//! synthetic key code to `console`.
//!
//! Events use the crate-wide `Arg` width; add `task-arg-8` or `task-arg-32`
//! to change it.
//!
//! Build with `cargo build --release --features demo --target thumbv7em-none-eabihf`.

#![no_std]
#![no_main]

use cortex_m_rt::{entry, exception};
use panic_halt as _;

use tickloop::arch::cortex_m4::{self, SysTickClock, Wfi};
use tickloop::{
    Arg, DefaultEventStorage, DefaultScheduler, DefaultTaskDescriptor, TaskArg, TickRunner,
    TickTaskDescriptor,
};

type Event = Arg;

const CONSOLE: usize = 0;
const SAMPLER: usize = 1;
const WATCHDOG: usize = 3;

const LINE_ABORT: Event = 0x1B;

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

static CONSOLE_QUEUE: DefaultEventStorage<16> = DefaultEventStorage::new();
static SAMPLER_QUEUE: DefaultEventStorage<4> = DefaultEventStorage::new();

static TASKS: [DefaultTaskDescriptor<'static>; 4] = [
    DefaultTaskDescriptor::event(console, &CONSOLE_QUEUE),
    DefaultTaskDescriptor::event(sampler, &SAMPLER_QUEUE).run_on_init(),
    DefaultTaskDescriptor::continuous(heartbeat, 500_000),
    DefaultTaskDescriptor::one_shot(watchdog_kick, 2_000_000),
];

static SCHEDULER: DefaultScheduler<'static, SysTickClock, 4> =
    DefaultScheduler::new(&TASKS, SysTickClock);

static TICK_TASKS: [TickTaskDescriptor; 1] = [TickTaskDescriptor::new(scan_keys, 10)];

static TICKER: TickRunner<'static, 1> = TickRunner::new(&TICK_TASKS);

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn console(byte: Event) -> bool {
    // Dropping the rest of the line is the flush directive.
    byte == LINE_ABORT
}

fn sampler(event: Event) -> bool {
    if event == Event::INIT_EVENT {
        let _ = SCHEDULER.start_timer(SAMPLER, Some(50_000));
    } else if event == Event::TIMEOUT_EVENT {
        let _ = SCHEDULER.start_timer(SAMPLER, None);
    }
    false
}

fn heartbeat(_event: Event) -> bool {
    let _ = SCHEDULER.post(CONSOLE, b'.' as Event);
    false
}

fn watchdog_kick(_event: Event) -> bool {
    let _ = SCHEDULER.enable(WATCHDOG);
    false
}

fn scan_keys(tick: u32) {
    let _ = SCHEDULER.post(CONSOLE, (tick % 0x80) as Event);
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

#[exception]
fn SysTick() {
    cortex_m4::on_systick();
    TICKER.on_tick();
}

#[entry]
fn main() -> ! {
    let Some(mut cp) = cortex_m::Peripherals::take() else {
        panic!("core peripherals already taken");
    };

    SCHEDULER.init();
    TICKER.init();
    cortex_m4::configure_systick(&mut cp.SYST);

    SCHEDULER.run(&Wfi)
}
