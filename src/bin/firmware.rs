//! # RP2040 Firmware
//!
//! The demo on real silicon. Probe GP22 (Task 0) and GP21 (Task 1) with a
//! two-channel scope; the startup banner goes out on UART0 (GP0/GP1).
//!
//! | Core | Context | Work |
//! |------|---------|------|
//! | 0 | reset context, turns into Task 0 | toggle GP22 every `TASK_0_DELAY_MS` |
//! | 1 | spawned Task 1 | pulse GP21 for `TIME_HOG_MS` under the lock |
//!
//! `PIN_1` (GP23) is wired to the power supply on the Pico, so Task 1 uses
//! `PICO_PIN_1` (GP21) here.
//!
//! Build with:
//! ```bash
//! cargo build --release --no-default-features --features rp2040 \
//!     --bin firmware --target thumbv6m-none-eabi
//! ```

#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

#[cfg(target_os = "none")]
mod firmware {
    use cortex_m::delay::Delay;
    use cortex_m_rt::entry;
    use panic_halt as _;

    use rp2040_hal as hal;

    use hal::clocks::Clock;
    use hal::fugit::RateExtU32;
    use hal::gpio::{FunctionUart, Pins};
    use hal::multicore::{Multicore, Stack};
    use hal::pac;
    use hal::sio::Sio;
    use hal::uart::{DataBits, StopBits, UartConfig, UartPeripheral};

    use dualcore_spinlock::arch::rp2040::{HwSpinLock, HOG_ITERATIONS_PER_MS, PICO_PIN_1};
    use dualcore_spinlock::config::DemoConfig;
    use dualcore_spinlock::delay::BusyWait;
    use dualcore_spinlock::task::{Hog, PeriodicUnit, Toggler};

    /// The linker will place this boot block at the start of our program image.
    #[link_section = ".boot2"]
    #[used]
    pub static BOOT2: [u8; 256] = rp2040_boot2::BOOT_LOADER_GENERIC_03H;

    /// External crystal on the Pico.
    const XTAL_FREQ_HZ: u32 = 12_000_000;

    const CONFIG: DemoConfig = DemoConfig::DEFAULT;

    // The HAL hands out pins as distinct types, so the line numbers below
    // are fixed at compile time. Keep them in step with the constants.
    const _: () = assert!(CONFIG.pin_0 == 22);
    const _: () = assert!(PICO_PIN_1 == 21);

    /// The lock both cores contend for.
    static SPINLOCK: HwSpinLock = HwSpinLock::new();

    /// Stack for core 1. Core 0 uses the stack cortex-m-rt sets up.
    static mut CORE1_STACK: Stack<4096> = Stack::new();

    #[entry]
    fn main() -> ! {
        let mut pac = pac::Peripherals::take().unwrap();
        let core = pac::CorePeripherals::take().unwrap();

        let mut watchdog = hal::watchdog::Watchdog::new(pac.WATCHDOG);
        let clocks = hal::clocks::init_clocks_and_plls(
            XTAL_FREQ_HZ,
            pac.XOSC,
            pac.CLOCKS,
            pac.PLL_SYS,
            pac.PLL_USB,
            &mut pac.RESETS,
            &mut watchdog,
        )
        .ok()
        .unwrap();

        let mut sio = Sio::new(pac.SIO);
        let pins = Pins::new(
            pac.IO_BANK0,
            pac.PADS_BANK0,
            sio.gpio_bank0,
            &mut pac.RESETS,
        );

        // Logging channel
        let uart_pins = (
            pins.gpio0.into_function::<FunctionUart>(),
            pins.gpio1.into_function::<FunctionUart>(),
        );
        let uart = UartPeripheral::new(pac.UART0, uart_pins, &mut pac.RESETS)
            .enable(
                UartConfig::new(
                    dualcore_spinlock::config::SERIAL_BAUD.Hz(),
                    DataBits::Eight,
                    None,
                    StopBits::One,
                ),
                clocks.peripheral_clock.freq(),
            )
            .unwrap();

        let sys_freq = clocks.system_clock.freq().to_Hz();
        let mut delay = Delay::new(core.SYST, sys_freq);

        delay.delay_ms(CONFIG.startup_delay_ms);
        uart.write_full_blocking(b"\r\nDual-core spinlock demo\r\n");

        let pin_0 = pins.gpio22.into_push_pull_output();
        let pin_1 = pins.gpio21.into_push_pull_output();

        // Task 1 on core 1
        let mut mc = Multicore::new(&mut pac.PSM, &mut pac.PPB, &mut sio.fifo);
        let cores = mc.cores();
        let core1 = &mut cores[1];
        core1
            .spawn(unsafe { &mut CORE1_STACK.mem }, move || {
                // Each core has its own SysTick; `cortex-m` only hands out one copy.
                let core = unsafe { pac::CorePeripherals::steal() };
                let sleep = Delay::new(core.SYST, sys_freq);

                Hog::new(
                    &SPINLOCK,
                    pin_1,
                    BusyWait::new(HOG_ITERATIONS_PER_MS),
                    sleep,
                    CONFIG.time_hog_ms,
                    CONFIG.task_1_delay_ms,
                )
                .run()
            })
            .unwrap();

        // The reset context never comes back to setup: it becomes Task 0.
        Toggler::new(&SPINLOCK, pin_0, delay, CONFIG.task_0_delay_ms)
            .with_lock(CONFIG.task_0_uses_lock)
            .run()
    }
}

#[cfg(not(target_os = "none"))]
fn main() {
    eprintln!("firmware: only runs on the RP2040, build it for thumbv6m-none-eabi");
}
