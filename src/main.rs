#![no_std]
#![no_main]

mod peripherals;
mod system;
mod ui;

// Panic handler and debugging
use defmt::unwrap;

use defmt_rtt as _;
use panic_probe as _;

// Core
use core::mem::MaybeUninit;

// Device
use embassy_executor::Spawner;
use embassy_futures::select::{select, Either};
use embassy_nrf::{
    bind_interrupts,
    gpio::{Input, Level, Output, OutputDrive, Pull},
    interrupt::{self, InterruptExt, Priority},
    peripherals::{SPI2, TWISPI1},
    spim,
    twim::{self, Twim},
};
use embassy_sync::{blocking_mutex::raw::ThreadModeRawMutex, channel::Channel, signal::Signal};
use embassy_time::{Duration, Instant, Timer};
use embedded_alloc::Heap;
use nrf_softdevice::Softdevice;
use static_cell::StaticCell;

bind_interrupts!(struct Irqs {
    SPIM1_SPIS1_TWIM1_TWIS1_SPI1_TWI1 => twim::InterruptHandler<TWISPI1>;
    SPIM2_SPIS2_SPI2 => spim::InterruptHandler<SPI2>;
});

// Crate
use peripherals::{
    backlight::Backlight,
    button::Button,
    display::Display,
    touch::{TouchController, TouchGesture},
};
use system::{
    bluetooth::{ble_task, softdevice_config, softdevice_task, Server},
    config::{SystemConfig, AMBIENT_TIMEOUT},
    data_layer::data_layer_task,
    time::SystemClock,
};
use ui::WatchFace;

// Others
use sunshine_face::{Clock, DataItem, Engine, FaceEvent, LinkCommand, TapKind, WeatherCell};

// Heap for data items decoded from JSON
#[global_allocator]
static HEAP: Heap = Heap::empty();

const HEAP_SIZE: usize = 16 * 1024;

// Communication channels
pub(crate) static FACE_EVENTS: Channel<ThreadModeRawMutex, FaceEvent, 8> = Channel::new();
pub(crate) static LINK: Signal<ThreadModeRawMutex, LinkCommand> = Signal::new();
pub(crate) static DATA_ITEMS: Channel<ThreadModeRawMutex, DataItem, 4> = Channel::new();
pub(crate) static PEER: Signal<ThreadModeRawMutex, bool> = Signal::new();
static USER_INPUT: Channel<ThreadModeRawMutex, UserInput, 4> = Channel::new();

// Weather snapshot shared by the face and the data layer
static WEATHER: StaticCell<WeatherCell<ThreadModeRawMutex>> = StaticCell::new();

/// Raw input for the screen manager
enum UserInput {
    Button,
    Touch { x: i32, y: i32, click: bool },
}

/// Drive the watch face
#[embassy_executor::task]
async fn face_task(mut face: WatchFace<'static, SPI2>) -> ! {
    face.run().await
}

/// Turn button presses, touches and inactivity into face lifecycle events
#[embassy_executor::task]
async fn screen_manager() -> ! {
    let mut visible = true;
    let mut ambient = false;

    loop {
        // Only the interactive screen times out
        let input = if visible && !ambient {
            match select(USER_INPUT.receive(), Timer::after(AMBIENT_TIMEOUT)).await {
                Either::First(input) => Some(input),
                Either::Second(()) => None,
            }
        } else {
            Some(USER_INPUT.receive().await)
        };

        match input {
            None => {
                ambient = true;
                FACE_EVENTS.send(FaceEvent::AmbientModeChanged(true)).await;
            }
            Some(UserInput::Button) => {
                visible = !visible;
                if visible && ambient {
                    ambient = false;
                    FACE_EVENTS.send(FaceEvent::AmbientModeChanged(false)).await;
                }
                FACE_EVENTS.send(FaceEvent::VisibilityChanged(visible)).await;
            }
            Some(UserInput::Touch { x, y, click }) if visible => {
                if ambient {
                    ambient = false;
                    FACE_EVENTS.send(FaceEvent::AmbientModeChanged(false)).await;
                } else if click {
                    let event = FaceEvent::Tap {
                        kind: TapKind::Tap,
                        x,
                        y,
                        time: Instant::now().as_millis(),
                    };
                    FACE_EVENTS.send(event).await;
                }
            }
            // Touches on a dark screen are ignored
            Some(UserInput::Touch { .. }) => {}
        }
    }
}

/// Raise a time tick at every full minute
#[embassy_executor::task]
async fn minute_ticker() -> ! {
    loop {
        let now = SystemClock.now_millis();
        Timer::after_millis((60_000 - now.rem_euclid(60_000)) as u64).await;
        FACE_EVENTS.send(FaceEvent::TimeTick).await;
    }
}

/// Polls the button state every 10ms
#[embassy_executor::task]
async fn poll_button(mut button: Button<'static>) -> ! {
    loop {
        if button.pressed().await {
            defmt::debug!("Button pressed");
            USER_INPUT.send(UserInput::Button).await;
        }

        // Re-schedule the timer interrupt in 10ms
        Timer::after(Duration::from_millis(10)).await;
    }
}

/// Polls the touch interrupt pin every 2ms
#[embassy_executor::task]
async fn poll_touch(mut touch: TouchController<'static, TWISPI1>) -> ! {
    loop {
        if let Some(event) = touch.try_event_detected() {
            let input = UserInput::Touch {
                x: event.x,
                y: event.y,
                click: matches!(event.gesture, TouchGesture::SingleClick),
            };
            USER_INPUT.send(input).await;
        }

        // Re-schedule the timer interrupt in 2ms
        Timer::after(Duration::from_millis(2)).await;
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    init_heap();
    let p = embassy_nrf::init(SystemConfig::new());
    defmt::info!("Initializing");

    // Keep peripheral interrupts clear of the SoftDevice priorities
    interrupt::SPIM1_SPIS1_TWIM1_TWIS1_SPI1_TWI1.set_priority(Priority::P3);
    interrupt::SPIM2_SPIS2_SPI2.set_priority(Priority::P3);

    // Initialize Bluetooth
    let sd = Softdevice::enable(&softdevice_config());
    let server = unwrap!(Server::new(sd));
    let sd: &'static Softdevice = sd;

    // Initialize Backlight
    let backlight = Backlight::init(
        Output::new(p.P0_14, Level::High, OutputDrive::Standard),
        Output::new(p.P0_22, Level::High, OutputDrive::Standard),
        Output::new(p.P0_23, Level::High, OutputDrive::Standard),
    );

    // Initialize Button
    let button = Button::init(
        Input::new(p.P0_13, Pull::None),
        Output::new(p.P0_15, Level::Low, OutputDrive::Standard),
    );

    // Initialize I2C
    let mut i2c_config = twim::Config::default();
    // Use I2C at 400KHz (the fastest clock available on the nRF52832),
    i2c_config.frequency = twim::Frequency::K400;
    let i2c = Twim::new(p.TWISPI1, Irqs, p.P0_06, p.P0_07, i2c_config);

    // Initialize touch controller
    let touch = unwrap!(TouchController::init(
        i2c,
        Input::new(p.P0_28, Pull::Up), // Touchpad external interrupt pin: P0.28/AIN4 (TP_INT)
        Output::new(p.P0_10, Level::High, OutputDrive::Standard), // Touchpad reset pin: P0.10/NFC2 (TP_RESET)
    ));

    // Initialize SPI
    let mut spim_config = spim::Config::default();
    // Use SPI at 8MHz (the fastest clock available on the nRF52832),
    // otherwise refreshing will be super slow.
    spim_config.frequency = spim::Frequency::M8;
    // SPI must be used in mode 3. Mode 0 (the default) won't work.
    spim_config.mode = spim::MODE_3;
    let spim = spim::Spim::new(p.SPI2, Irqs, p.P0_02, p.P0_04, p.P0_03, spim_config);

    // Initialize LCD
    let display = unwrap!(Display::init(
        spim,
        Output::new(p.P0_25, Level::Low, OutputDrive::Standard),
        Output::new(p.P0_18, Level::Low, OutputDrive::Standard),
        Output::new(p.P0_26, Level::Low, OutputDrive::Standard),
    ));

    // Initialize watch face
    let config = SystemConfig::face();
    let weather: &'static WeatherCell<ThreadModeRawMutex> =
        WEATHER.init(WeatherCell::new(config.placeholder_weather()));
    let engine = Engine::new(config, SystemClock, weather);
    let face = WatchFace::new(engine, display, backlight);

    defmt::info!("Initialization finished");

    // Schedule tasks
    unwrap!(spawner.spawn(softdevice_task(sd)));
    unwrap!(spawner.spawn(ble_task(sd, server)));
    unwrap!(spawner.spawn(data_layer_task(weather)));
    unwrap!(spawner.spawn(face_task(face)));
    unwrap!(spawner.spawn(screen_manager()));
    unwrap!(spawner.spawn(minute_ticker()));
    unwrap!(spawner.spawn(poll_button(button)));
    unwrap!(spawner.spawn(poll_touch(touch)));

    // The screen is on after boot
    FACE_EVENTS.send(FaceEvent::VisibilityChanged(true)).await;
}

/// Hand the heap its memory before anything allocates
fn init_heap() {
    static mut HEAP_MEM: [MaybeUninit<u8>; HEAP_SIZE] = [MaybeUninit::uninit(); HEAP_SIZE];
    #[allow(static_mut_refs)]
    unsafe {
        HEAP.init(HEAP_MEM.as_ptr() as usize, HEAP_SIZE)
    }
}
