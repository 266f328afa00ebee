//! Event category/code tables: per-category code maxima, symbolic names for
//! log comments, and the fixed safety exclusion list.

use input_linux_sys as sys;

pub const EV_SYN: u16 = sys::EV_SYN as u16;
pub const EV_KEY: u16 = sys::EV_KEY as u16;
pub const EV_REL: u16 = sys::EV_REL as u16;
pub const EV_ABS: u16 = sys::EV_ABS as u16;
pub const EV_MSC: u16 = sys::EV_MSC as u16;
pub const EV_SW: u16 = sys::EV_SW as u16;
pub const EV_LED: u16 = sys::EV_LED as u16;
pub const EV_SND: u16 = sys::EV_SND as u16;
pub const EV_REP: u16 = sys::EV_REP as u16;
pub const EV_FF: u16 = sys::EV_FF as u16;
pub const EV_PWR: u16 = 0x16;
pub const EV_FF_STATUS: u16 = 0x17;
pub const EV_MAX: u16 = sys::EV_MAX as u16;

pub const SYN_REPORT: u16 = sys::SYN_REPORT as u16;

pub const KEY_POWER: u16 = sys::KEY_POWER as u16;
pub const KEY_POWER2: u16 = sys::KEY_POWER2 as u16;
pub const KEY_SLEEP: u16 = sys::KEY_SLEEP as u16;
pub const KEY_SUSPEND: u16 = sys::KEY_SUSPEND as u16;
pub const KEY_RESTART: u16 = sys::KEY_RESTART as u16;
pub const SW_LID: u16 = sys::SW_LID as u16;
pub const SW_TABLET_MODE: u16 = sys::SW_TABLET_MODE as u16;
pub const SW_RFKILL_ALL: u16 = sys::SW_RFKILL_ALL as u16;

/// Codes that are never written to a device, so a run can't power off,
/// suspend or otherwise reconfigure the machine it runs on.
pub const SAFETY_EXCLUSIONS: &[(u16, u16)] = &[
    (EV_SW, SW_RFKILL_ALL),
    (EV_SW, SW_TABLET_MODE),
    (EV_SW, SW_LID),
    (EV_KEY, KEY_POWER),
    (EV_KEY, KEY_POWER2),
    (EV_KEY, KEY_SLEEP),
    (EV_KEY, KEY_SUSPEND),
    (EV_KEY, KEY_RESTART),
];

#[inline]
pub fn is_excluded(type_: u16, code: u16) -> bool {
    SAFETY_EXCLUSIONS.contains(&(type_, code))
}

/// Maximum code for a category, or `None` if the category has no
/// enumerable codes. EV_PWR and EV_FF_STATUS are output-only and have none.
pub fn type_max(type_: u16) -> Option<u16> {
    let max = match type_ {
        EV_SYN => sys::SYN_MAX as u16,
        EV_KEY => sys::KEY_MAX as u16,
        EV_REL => sys::REL_MAX as u16,
        EV_ABS => sys::ABS_MAX as u16,
        EV_MSC => sys::MSC_MAX as u16,
        EV_SW => sys::SW_MAX as u16,
        EV_LED => sys::LED_MAX as u16,
        EV_SND => sys::SND_MAX as u16,
        EV_REP => sys::REP_MAX as u16,
        EV_FF => sys::FF_MAX as u16,
        _ => return None,
    };
    Some(max)
}

/// Categories with a per-code bitmap: the ones uinput has a `UI_SET_*BIT`
/// request for and evdev answers `EVIOCGBIT` for. Any other category can
/// only be set or reported as a bare type bit.
#[inline]
pub fn has_code_bitmap(type_: u16) -> bool {
    matches!(
        type_,
        EV_KEY | EV_REL | EV_ABS | EV_MSC | EV_SW | EV_LED | EV_SND | EV_FF
    )
}

/// Key-like and switch-like categories only ever carry 0 or 1.
#[inline]
pub fn is_binary(type_: u16) -> bool {
    type_ == EV_KEY || type_ == EV_SW
}

#[inline]
pub fn type_name(type_: u16) -> &'static str {
    match type_ {
        EV_SYN => "EV_SYN",
        EV_KEY => "EV_KEY",
        EV_REL => "EV_REL",
        EV_ABS => "EV_ABS",
        EV_MSC => "EV_MSC",
        EV_SW => "EV_SW",
        EV_LED => "EV_LED",
        EV_SND => "EV_SND",
        EV_REP => "EV_REP",
        EV_FF => "EV_FF",
        EV_PWR => "EV_PWR",
        EV_FF_STATUS => "EV_FF_STATUS",
        _ => "UNKNOWN",
    }
}

pub fn code_name(type_: u16, code: u16) -> &'static str {
    let table = match type_ {
        EV_SYN => &SYN_NAMES,
        EV_KEY => &KEY_NAMES,
        EV_REL => &REL_NAMES,
        EV_ABS => &ABS_NAMES,
        EV_MSC => &MSC_NAMES,
        EV_SW => &SW_NAMES,
        EV_LED => &LED_NAMES,
        EV_SND => &SND_NAMES,
        EV_REP => &REP_NAMES,
        EV_FF => &FF_NAMES,
        EV_FF_STATUS => &FF_STATUS_NAMES,
        _ => return "UNKNOWN",
    };
    table.get(&code).copied().unwrap_or("UNKNOWN")
}

static SYN_NAMES: phf::Map<u16, &'static str> = phf::phf_map! {
    0u16 => "SYN_REPORT",
    1u16 => "SYN_CONFIG",
    2u16 => "SYN_MT_REPORT",
    3u16 => "SYN_DROPPED",
};

static KEY_NAMES: phf::Map<u16, &'static str> = phf::phf_map! {
    0u16 => "KEY_RESERVED",
    1u16 => "KEY_ESC",
    2u16 => "KEY_1",
    3u16 => "KEY_2",
    4u16 => "KEY_3",
    5u16 => "KEY_4",
    6u16 => "KEY_5",
    7u16 => "KEY_6",
    8u16 => "KEY_7",
    9u16 => "KEY_8",
    10u16 => "KEY_9",
    11u16 => "KEY_0",
    12u16 => "KEY_MINUS",
    13u16 => "KEY_EQUAL",
    14u16 => "KEY_BACKSPACE",
    15u16 => "KEY_TAB",
    16u16 => "KEY_Q",
    17u16 => "KEY_W",
    18u16 => "KEY_E",
    19u16 => "KEY_R",
    20u16 => "KEY_T",
    21u16 => "KEY_Y",
    22u16 => "KEY_U",
    23u16 => "KEY_I",
    24u16 => "KEY_O",
    25u16 => "KEY_P",
    26u16 => "KEY_LEFTBRACE",
    27u16 => "KEY_RIGHTBRACE",
    28u16 => "KEY_ENTER",
    29u16 => "KEY_LEFTCTRL",
    30u16 => "KEY_A",
    31u16 => "KEY_S",
    32u16 => "KEY_D",
    33u16 => "KEY_F",
    34u16 => "KEY_G",
    35u16 => "KEY_H",
    36u16 => "KEY_J",
    37u16 => "KEY_K",
    38u16 => "KEY_L",
    39u16 => "KEY_SEMICOLON",
    40u16 => "KEY_APOSTROPHE",
    41u16 => "KEY_GRAVE",
    42u16 => "KEY_LEFTSHIFT",
    43u16 => "KEY_BACKSLASH",
    44u16 => "KEY_Z",
    45u16 => "KEY_X",
    46u16 => "KEY_C",
    47u16 => "KEY_V",
    48u16 => "KEY_B",
    49u16 => "KEY_N",
    50u16 => "KEY_M",
    51u16 => "KEY_COMMA",
    52u16 => "KEY_DOT",
    53u16 => "KEY_SLASH",
    54u16 => "KEY_RIGHTSHIFT",
    55u16 => "KEY_KPASTERISK",
    56u16 => "KEY_LEFTALT",
    57u16 => "KEY_SPACE",
    58u16 => "KEY_CAPSLOCK",
    59u16 => "KEY_F1",
    60u16 => "KEY_F2",
    61u16 => "KEY_F3",
    62u16 => "KEY_F4",
    63u16 => "KEY_F5",
    64u16 => "KEY_F6",
    65u16 => "KEY_F7",
    66u16 => "KEY_F8",
    67u16 => "KEY_F9",
    68u16 => "KEY_F10",
    69u16 => "KEY_NUMLOCK",
    70u16 => "KEY_SCROLLLOCK",
    71u16 => "KEY_KP7",
    72u16 => "KEY_KP8",
    73u16 => "KEY_KP9",
    74u16 => "KEY_KPMINUS",
    75u16 => "KEY_KP4",
    76u16 => "KEY_KP5",
    77u16 => "KEY_KP6",
    78u16 => "KEY_KPPLUS",
    79u16 => "KEY_KP1",
    80u16 => "KEY_KP2",
    81u16 => "KEY_KP3",
    82u16 => "KEY_KP0",
    83u16 => "KEY_KPDOT",
    87u16 => "KEY_F11",
    88u16 => "KEY_F12",
    96u16 => "KEY_KPENTER",
    97u16 => "KEY_RIGHTCTRL",
    98u16 => "KEY_KPSLASH",
    99u16 => "KEY_SYSRQ",
    100u16 => "KEY_RIGHTALT",
    102u16 => "KEY_HOME",
    103u16 => "KEY_UP",
    104u16 => "KEY_PAGEUP",
    105u16 => "KEY_LEFT",
    106u16 => "KEY_RIGHT",
    107u16 => "KEY_END",
    108u16 => "KEY_DOWN",
    109u16 => "KEY_PAGEDOWN",
    110u16 => "KEY_INSERT",
    111u16 => "KEY_DELETE",
    113u16 => "KEY_MUTE",
    114u16 => "KEY_VOLUMEDOWN",
    115u16 => "KEY_VOLUMEUP",
    116u16 => "KEY_POWER",
    117u16 => "KEY_KPEQUAL",
    119u16 => "KEY_PAUSE",
    125u16 => "KEY_LEFTMETA",
    126u16 => "KEY_RIGHTMETA",
    127u16 => "KEY_COMPOSE",
    142u16 => "KEY_SLEEP",
    143u16 => "KEY_WAKEUP",
    205u16 => "KEY_SUSPEND",
    224u16 => "KEY_BRIGHTNESSDOWN",
    225u16 => "KEY_BRIGHTNESSUP",
    240u16 => "KEY_UNKNOWN",
    0x100u16 => "BTN_0",
    0x101u16 => "BTN_1",
    0x102u16 => "BTN_2",
    0x103u16 => "BTN_3",
    0x104u16 => "BTN_4",
    0x105u16 => "BTN_5",
    0x106u16 => "BTN_6",
    0x107u16 => "BTN_7",
    0x108u16 => "BTN_8",
    0x109u16 => "BTN_9",
    0x110u16 => "BTN_LEFT",
    0x111u16 => "BTN_RIGHT",
    0x112u16 => "BTN_MIDDLE",
    0x113u16 => "BTN_SIDE",
    0x114u16 => "BTN_EXTRA",
    0x115u16 => "BTN_FORWARD",
    0x116u16 => "BTN_BACK",
    0x117u16 => "BTN_TASK",
    0x120u16 => "BTN_TRIGGER",
    0x121u16 => "BTN_THUMB",
    0x122u16 => "BTN_THUMB2",
    0x123u16 => "BTN_TOP",
    0x124u16 => "BTN_TOP2",
    0x125u16 => "BTN_PINKIE",
    0x126u16 => "BTN_BASE",
    0x12fu16 => "BTN_DEAD",
    0x130u16 => "BTN_SOUTH",
    0x131u16 => "BTN_EAST",
    0x132u16 => "BTN_C",
    0x133u16 => "BTN_NORTH",
    0x134u16 => "BTN_WEST",
    0x135u16 => "BTN_Z",
    0x136u16 => "BTN_TL",
    0x137u16 => "BTN_TR",
    0x138u16 => "BTN_TL2",
    0x139u16 => "BTN_TR2",
    0x13au16 => "BTN_SELECT",
    0x13bu16 => "BTN_START",
    0x13cu16 => "BTN_MODE",
    0x13du16 => "BTN_THUMBL",
    0x13eu16 => "BTN_THUMBR",
    0x140u16 => "BTN_TOOL_PEN",
    0x141u16 => "BTN_TOOL_RUBBER",
    0x142u16 => "BTN_TOOL_BRUSH",
    0x143u16 => "BTN_TOOL_PENCIL",
    0x144u16 => "BTN_TOOL_AIRBRUSH",
    0x145u16 => "BTN_TOOL_FINGER",
    0x146u16 => "BTN_TOOL_MOUSE",
    0x147u16 => "BTN_TOOL_LENS",
    0x148u16 => "BTN_TOOL_QUINTTAP",
    0x149u16 => "BTN_STYLUS3",
    0x14au16 => "BTN_TOUCH",
    0x14bu16 => "BTN_STYLUS",
    0x14cu16 => "BTN_STYLUS2",
    0x14du16 => "BTN_TOOL_DOUBLETAP",
    0x14eu16 => "BTN_TOOL_TRIPLETAP",
    0x14fu16 => "BTN_TOOL_QUADTAP",
    0x150u16 => "BTN_GEAR_DOWN",
    0x151u16 => "BTN_GEAR_UP",
    0x164u16 => "KEY_POWER2",
    0x198u16 => "KEY_RESTART",
    0x220u16 => "BTN_DPAD_UP",
    0x221u16 => "BTN_DPAD_DOWN",
    0x222u16 => "BTN_DPAD_LEFT",
    0x223u16 => "BTN_DPAD_RIGHT",
    0x2c0u16 => "BTN_TRIGGER_HAPPY1",
};

static REL_NAMES: phf::Map<u16, &'static str> = phf::phf_map! {
    0x00u16 => "REL_X",
    0x01u16 => "REL_Y",
    0x02u16 => "REL_Z",
    0x03u16 => "REL_RX",
    0x04u16 => "REL_RY",
    0x05u16 => "REL_RZ",
    0x06u16 => "REL_HWHEEL",
    0x07u16 => "REL_DIAL",
    0x08u16 => "REL_WHEEL",
    0x09u16 => "REL_MISC",
    0x0au16 => "REL_RESERVED",
    0x0bu16 => "REL_WHEEL_HI_RES",
    0x0cu16 => "REL_HWHEEL_HI_RES",
};

static ABS_NAMES: phf::Map<u16, &'static str> = phf::phf_map! {
    0x00u16 => "ABS_X",
    0x01u16 => "ABS_Y",
    0x02u16 => "ABS_Z",
    0x03u16 => "ABS_RX",
    0x04u16 => "ABS_RY",
    0x05u16 => "ABS_RZ",
    0x06u16 => "ABS_THROTTLE",
    0x07u16 => "ABS_RUDDER",
    0x08u16 => "ABS_WHEEL",
    0x09u16 => "ABS_GAS",
    0x0au16 => "ABS_BRAKE",
    0x10u16 => "ABS_HAT0X",
    0x11u16 => "ABS_HAT0Y",
    0x12u16 => "ABS_HAT1X",
    0x13u16 => "ABS_HAT1Y",
    0x14u16 => "ABS_HAT2X",
    0x15u16 => "ABS_HAT2Y",
    0x16u16 => "ABS_HAT3X",
    0x17u16 => "ABS_HAT3Y",
    0x18u16 => "ABS_PRESSURE",
    0x19u16 => "ABS_DISTANCE",
    0x1au16 => "ABS_TILT_X",
    0x1bu16 => "ABS_TILT_Y",
    0x1cu16 => "ABS_TOOL_WIDTH",
    0x20u16 => "ABS_VOLUME",
    0x21u16 => "ABS_PROFILE",
    0x28u16 => "ABS_MISC",
    0x2eu16 => "ABS_RESERVED",
    0x2fu16 => "ABS_MT_SLOT",
    0x30u16 => "ABS_MT_TOUCH_MAJOR",
    0x31u16 => "ABS_MT_TOUCH_MINOR",
    0x32u16 => "ABS_MT_WIDTH_MAJOR",
    0x33u16 => "ABS_MT_WIDTH_MINOR",
    0x34u16 => "ABS_MT_ORIENTATION",
    0x35u16 => "ABS_MT_POSITION_X",
    0x36u16 => "ABS_MT_POSITION_Y",
    0x37u16 => "ABS_MT_TOOL_TYPE",
    0x38u16 => "ABS_MT_BLOB_ID",
    0x39u16 => "ABS_MT_TRACKING_ID",
    0x3au16 => "ABS_MT_PRESSURE",
    0x3bu16 => "ABS_MT_DISTANCE",
    0x3cu16 => "ABS_MT_TOOL_X",
    0x3du16 => "ABS_MT_TOOL_Y",
};

static MSC_NAMES: phf::Map<u16, &'static str> = phf::phf_map! {
    0x00u16 => "MSC_SERIAL",
    0x01u16 => "MSC_PULSELED",
    0x02u16 => "MSC_GESTURE",
    0x03u16 => "MSC_RAW",
    0x04u16 => "MSC_SCAN",
    0x05u16 => "MSC_TIMESTAMP",
};

static SW_NAMES: phf::Map<u16, &'static str> = phf::phf_map! {
    0x00u16 => "SW_LID",
    0x01u16 => "SW_TABLET_MODE",
    0x02u16 => "SW_HEADPHONE_INSERT",
    0x03u16 => "SW_RFKILL_ALL",
    0x04u16 => "SW_MICROPHONE_INSERT",
    0x05u16 => "SW_DOCK",
    0x06u16 => "SW_LINEOUT_INSERT",
    0x07u16 => "SW_JACK_PHYSICAL_INSERT",
    0x08u16 => "SW_VIDEOOUT_INSERT",
    0x09u16 => "SW_CAMERA_LENS_COVER",
    0x0au16 => "SW_KEYPAD_SLIDE",
    0x0bu16 => "SW_FRONT_PROXIMITY",
    0x0cu16 => "SW_ROTATE_LOCK",
    0x0du16 => "SW_LINEIN_INSERT",
    0x0eu16 => "SW_MUTE_DEVICE",
    0x0fu16 => "SW_PEN_INSERTED",
    0x10u16 => "SW_MACHINE_COVER",
};

static LED_NAMES: phf::Map<u16, &'static str> = phf::phf_map! {
    0x00u16 => "LED_NUML",
    0x01u16 => "LED_CAPSL",
    0x02u16 => "LED_SCROLLL",
    0x03u16 => "LED_COMPOSE",
    0x04u16 => "LED_KANA",
    0x05u16 => "LED_SLEEP",
    0x06u16 => "LED_SUSPEND",
    0x07u16 => "LED_MUTE",
    0x08u16 => "LED_MISC",
    0x09u16 => "LED_MAIL",
    0x0au16 => "LED_CHARGING",
};

static SND_NAMES: phf::Map<u16, &'static str> = phf::phf_map! {
    0x00u16 => "SND_CLICK",
    0x01u16 => "SND_BELL",
    0x02u16 => "SND_TONE",
};

static REP_NAMES: phf::Map<u16, &'static str> = phf::phf_map! {
    0x00u16 => "REP_DELAY",
    0x01u16 => "REP_PERIOD",
};

static FF_NAMES: phf::Map<u16, &'static str> = phf::phf_map! {
    0x50u16 => "FF_RUMBLE",
    0x51u16 => "FF_PERIODIC",
    0x52u16 => "FF_CONSTANT",
    0x53u16 => "FF_SPRING",
    0x54u16 => "FF_FRICTION",
    0x55u16 => "FF_DAMPER",
    0x56u16 => "FF_INERTIA",
    0x57u16 => "FF_RAMP",
    0x58u16 => "FF_SQUARE",
    0x59u16 => "FF_TRIANGLE",
    0x5au16 => "FF_SINE",
    0x5bu16 => "FF_SAW_UP",
    0x5cu16 => "FF_SAW_DOWN",
    0x5du16 => "FF_CUSTOM",
    0x60u16 => "FF_GAIN",
    0x61u16 => "FF_AUTOCENTER",
};

static FF_STATUS_NAMES: phf::Map<u16, &'static str> = phf::phf_map! {
    0x00u16 => "FF_STATUS_STOPPED",
    0x01u16 => "FF_STATUS_PLAYING",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maxima_match_kernel_headers() {
        assert_eq!(type_max(EV_KEY), Some(0x2ff));
        assert_eq!(type_max(EV_ABS), Some(0x3f));
        assert_eq!(type_max(EV_SW), Some(0x10));
        assert_eq!(type_max(EV_PWR), None);
        assert_eq!(type_max(EV_FF_STATUS), None);
        assert_eq!(type_max(0x06), None);
        assert_eq!(EV_MAX, 0x1f);
    }

    #[test]
    fn bitmap_categories_are_the_evdev_readable_ones() {
        let readable: Vec<u16> = (1..=EV_MAX).filter(|&t| has_code_bitmap(t)).collect();
        assert_eq!(
            readable,
            vec![EV_KEY, EV_REL, EV_ABS, EV_MSC, EV_SW, EV_LED, EV_SND, EV_FF]
        );
        assert!(!has_code_bitmap(EV_REP));
        assert!(!has_code_bitmap(EV_FF_STATUS));
        // Every category with codes, except the skipped EV_REP, has a bitmap.
        for t in 1..=EV_MAX {
            if t != EV_REP && type_max(t).is_some() {
                assert!(has_code_bitmap(t), "category {t:#x}");
            }
        }
    }

    #[test]
    fn exclusion_list_covers_power_controls() {
        assert!(is_excluded(EV_KEY, 116));
        assert!(is_excluded(EV_SW, 0));
        assert!(!is_excluded(EV_KEY, 30));
        assert!(!is_excluded(EV_ABS, 0));
    }

    #[test]
    fn names_fall_back_to_unknown() {
        assert_eq!(code_name(EV_KEY, 30), "KEY_A");
        assert_eq!(code_name(EV_ABS, 0x35), "ABS_MT_POSITION_X");
        assert_eq!(code_name(EV_KEY, 0x2ff), "UNKNOWN");
        assert_eq!(code_name(EV_PWR, 0), "UNKNOWN");
        assert_eq!(type_name(0x1e), "UNKNOWN");
    }

    #[test]
    fn only_keys_and_switches_are_binary() {
        assert!(is_binary(EV_KEY));
        assert!(is_binary(EV_SW));
        assert!(!is_binary(EV_ABS));
        assert!(!is_binary(EV_REL));
    }
}
