/// Register values written during init, update and sleep.
pub struct Flag;
impl Flag {
    // Driver Output Control (0x01), third byte
    pub const DRIVER_OUTPUT_GATE_SCAN_FROM_G0: u8 = 0x00;

    // Data Entry Mode (0x11)
    pub const DATA_ENTRY_INCRY_INCRX: u8 = 0x03; // Y increment, X increment

    // Deep Sleep Mode (0x10)
    pub const DEEP_SLEEP_MODE_1: u8 = 0x01; // RAM retained

    // Temperature Sensor Control (0x18)
    pub const INTERNAL_TEMP_SENSOR: u8 = 0x80;

    // Border Waveform Control (0x3C), follow LUT with LUT1
    pub const BORDER_WAVEFORM_FOLLOW_LUT1: u8 = 0x05;

    // Display Update Control 1 (0x21): normal RAM content, source S8..S167
    pub const DISPLAY_UPDATE_NORMAL: [u8; 2] = [0x00, 0x80];

    // Display Update Control 2 (0x22): clock, analog, temperature, LUT, display
    pub const DISPLAY_UPDATE_FULL: u8 = 0xF7;

    // Voltages for the MagTag panel
    pub const GATE_VOLTAGE_VGH: u8 = 0x17;
    pub const SOURCE_VOLTAGE: [u8; 3] = [0x41, 0x00, 0x32];
    pub const VCOM: u8 = 0x36;

    // RAM bits: 1 is white, 0 is black
    pub const RAM_ALL_WHITE: u8 = 0xFF;
}
