//! Hardware smoke test for the HD44780 driver.
//!
//! Configured through the environment (or a `.env` file):
//! - `LCD_GPIO_CHIP`: GPIO character device, `/dev/gpiochip0` by default,
//! - `LCD_PIN_RS`, `LCD_PIN_E`: line numbers of the RS and E pins,
//! - `LCD_PINS_DATA`: line numbers of D4 to D7, separated by commas or spaces,
//! - `LCD_TEXT`: text for the second line, optional,
//! - `LCD_ENTRY_DIRECTION`: `left` or `right`, optional.
use dotenv::dotenv;
use lcd1602_gpio::gpiod::GpiodDriver;
use lcd1602_gpio::lcd::hd44780::driver::{
    CursorDirection, GpioHD44780Driver, HD44780Driver, HD44780Pins,
};
use lcd1602_gpio::GpioDriver;
use log::{debug, info};
use std::env::var;
use std::thread::sleep;
use std::time::Duration;

fn parse_pin_bus(pin_str: &str) -> eyre::Result<[usize; 4]> {
    pin_str
        .split([',', ' ', ';'])
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse())
        .collect::<Result<Vec<_>, _>>()?
        .try_into()
        .map_err(|_| eyre::eyre!("Invalid number of data pins"))
}

fn main() -> eyre::Result<()> {
    dotenv().ok();
    pretty_env_logger::init();

    let chip_path = var("LCD_GPIO_CHIP").unwrap_or_else(|_| "/dev/gpiochip0".to_string());
    let rs_pin_no: usize = var("LCD_PIN_RS")?.parse()?;
    let e_pin_no: usize = var("LCD_PIN_E")?.parse()?;
    let data_pin_nos = parse_pin_bus(&var("LCD_PINS_DATA")?)?;
    let text = var("LCD_TEXT").unwrap_or_else(|_| "HD44780 4-bit".to_string());
    let direction: CursorDirection = match var("LCD_ENTRY_DIRECTION") {
        Ok(direction) => direction.parse()?,
        Err(_) => CursorDirection::Right,
    };

    info!("LCD @ {}, RS: {}, E: {}, Data: {:?}", chip_path, rs_pin_no, e_pin_no, data_pin_nos);

    let gpio = GpiodDriver::open(&chip_path)?;
    debug!("{:?} initialized.", gpio);

    let mut rs_pin = gpio.get_pin(rs_pin_no)?;
    let mut e_pin = gpio.get_pin(e_pin_no)?;
    let mut data_bus = gpio.get_pin_bus(data_pin_nos)?;

    let mut lcd = GpioHD44780Driver::new(HD44780Pins {
        rs: &mut *rs_pin,
        e: &mut *e_pin,
        data: &mut *data_bus,
    })?;
    debug!("{:?} initialized.", lcd);

    lcd.set_entry_mode(Some(direction), None)?;
    if direction == CursorDirection::Left {
        lcd.set_cursor(0, 15)?;
    }
    lcd.write("Hello, world!")?;
    lcd.set_cursor(1, 0)?;
    lcd.write_lossy(&text)?;

    info!("Text written, showing cursor.");
    lcd.set_display_mode(None, Some(true), Some(true))?;
    sleep(Duration::from_secs(2));

    for _ in 0..4 {
        lcd.move_cursor(CursorDirection::Left)?;
        sleep(Duration::from_millis(250));
    }
    lcd.set_display_mode(None, Some(false), Some(false))?;

    info!("Shifting display.");
    for _ in 0..8 {
        lcd.shift_display(CursorDirection::Left)?;
        sleep(Duration::from_millis(250));
    }
    lcd.home()?;
    sleep(Duration::from_secs(1));

    lcd.clear()?;
    lcd.set_entry_mode(Some(CursorDirection::Right), None)?;
    lcd.write("Done.")?;
    info!("Done.");

    Ok(())
}
