use std::sync::Arc;

use crate::logger;
use crate::worker::Switches;

/// Global hotkeys. They only touch the shared switches; the worker turns
/// those into strategy calls on its own thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hotkey {
    /// F5
    ToggleEnabled,
    /// F6
    RecordPosition,
}

pub fn apply(hotkey: Hotkey, switches: &Switches) {
    match hotkey {
        Hotkey::ToggleEnabled => {
            let on = switches.toggle_enabled();
            logger::info(&format!("hotkey: {}", if on { "enabled" } else { "disabled" }));
        }
        Hotkey::RecordPosition => switches.request_record(),
    }
}

/// Listen for F5/F6 on a background thread (macOS event tap).
#[cfg(target_os = "macos")]
pub fn start_hotkey_listener(switches: Arc<Switches>) {
    use std::ffi::c_void;

    type CGEventTapProxy = *mut c_void;
    type CGEventRef = *mut c_void;
    type CFMachPortRef = *mut c_void;
    type CFRunLoopSourceRef = *mut c_void;
    type CFRunLoopRef = *mut c_void;
    type CFStringRef = *const c_void;
    type CGEventMask = u64;
    type CGEventType = u32;

    type CGEventTapCallBack =
        unsafe extern "C" fn(CGEventTapProxy, CGEventType, CGEventRef, *mut c_void) -> CGEventRef;

    const K_CG_HID_EVENT_TAP: u32 = 0;
    const K_CG_HEAD_INSERT_EVENT_TAP: u32 = 0;
    const K_CG_EVENT_TAP_OPTION_LISTEN_ONLY: u32 = 1;
    const CG_EVENT_KEY_DOWN: u32 = 10;
    const K_CG_KEYBOARD_EVENT_AUTOREPEAT: u32 = 8;
    const K_CG_KEYBOARD_EVENT_KEYCODE: u32 = 9;
    const KEYCODE_F5: i64 = 96;
    const KEYCODE_F6: i64 = 97;

    #[link(name = "ApplicationServices", kind = "framework")]
    #[link(name = "CoreFoundation", kind = "framework")]
    extern "C" {
        fn CGEventTapCreate(
            tap: u32,
            place: u32,
            options: u32,
            events_of_interest: CGEventMask,
            callback: CGEventTapCallBack,
            user_info: *mut c_void,
        ) -> CFMachPortRef;
        fn CFMachPortCreateRunLoopSource(
            allocator: *const c_void,
            port: CFMachPortRef,
            order: i64,
        ) -> CFRunLoopSourceRef;
        fn CFRunLoopGetCurrent() -> CFRunLoopRef;
        fn CFRunLoopAddSource(rl: CFRunLoopRef, source: CFRunLoopSourceRef, mode: CFStringRef);
        fn CFRunLoopRun();
        fn CGEventGetIntegerValueField(event: CGEventRef, field: u32) -> i64;
        fn CGEventTapEnable(tap: CFMachPortRef, enable: bool);

        static kCFRunLoopCommonModes: CFStringRef;
    }

    unsafe extern "C" fn callback(
        _proxy: CGEventTapProxy,
        event_type: CGEventType,
        event: CGEventRef,
        user_info: *mut c_void,
    ) -> CGEventRef {
        unsafe {
            if event_type != CG_EVENT_KEY_DOWN
                || CGEventGetIntegerValueField(event, K_CG_KEYBOARD_EVENT_AUTOREPEAT) != 0
            {
                return event;
            }
            let hotkey = match CGEventGetIntegerValueField(event, K_CG_KEYBOARD_EVENT_KEYCODE) {
                KEYCODE_F5 => Hotkey::ToggleEnabled,
                KEYCODE_F6 => Hotkey::RecordPosition,
                _ => return event,
            };
            apply(hotkey, &*(user_info as *const Switches));
            event
        }
    }

    std::thread::spawn(move || unsafe {
        let user_info = Arc::into_raw(switches) as *mut c_void;
        let tap = CGEventTapCreate(
            K_CG_HID_EVENT_TAP,
            K_CG_HEAD_INSERT_EVENT_TAP,
            K_CG_EVENT_TAP_OPTION_LISTEN_ONLY,
            1 << CG_EVENT_KEY_DOWN,
            callback,
            user_info,
        );
        if tap.is_null() {
            logger::error("cannot create event tap for F5/F6, grant Accessibility permission to the terminal");
            drop(Arc::from_raw(user_info as *const Switches));
            return;
        }
        let source = CFMachPortCreateRunLoopSource(std::ptr::null(), tap, 0);
        CFRunLoopAddSource(CFRunLoopGetCurrent(), source, kCFRunLoopCommonModes);
        CGEventTapEnable(tap, true);
        logger::info("hotkeys: F5 start/stop, F6 record position");
        CFRunLoopRun();
    });
}

/// Listen for F5/F6 on a background thread (Windows RegisterHotKey).
#[cfg(target_os = "windows")]
pub fn start_hotkey_listener(switches: Arc<Switches>) {
    use std::ffi::c_void;

    type HWND = *mut c_void;
    type BOOL = i32;
    type UINT = u32;

    #[repr(C)]
    struct POINT {
        x: i32,
        y: i32,
    }

    #[repr(C)]
    struct MSG {
        hwnd: HWND,
        message: UINT,
        w_param: usize,
        l_param: isize,
        time: u32,
        pt: POINT,
    }

    const MOD_NOREPEAT: u32 = 0x4000;
    const VK_F5: u32 = 0x74;
    const VK_F6: u32 = 0x75;
    const WM_HOTKEY: u32 = 0x0312;
    const ID_TOGGLE: usize = 1;
    const ID_RECORD: usize = 2;

    #[link(name = "user32")]
    extern "system" {
        fn RegisterHotKey(hwnd: HWND, id: i32, fs_modifiers: UINT, vk: UINT) -> BOOL;
        fn GetMessageW(msg: *mut MSG, hwnd: HWND, min: UINT, max: UINT) -> BOOL;
    }

    std::thread::spawn(move || unsafe {
        for (id, vk, name) in [(ID_TOGGLE, VK_F5, "F5"), (ID_RECORD, VK_F6, "F6")] {
            if RegisterHotKey(std::ptr::null_mut(), id as i32, MOD_NOREPEAT, vk) == 0 {
                logger::error(&format!("cannot register hotkey {}, another application owns it", name));
            }
        }
        logger::info("hotkeys: F5 start/stop, F6 record position");

        let mut msg: MSG = std::mem::zeroed();
        while GetMessageW(&mut msg, std::ptr::null_mut(), 0, 0) > 0 {
            if msg.message != WM_HOTKEY {
                continue;
            }
            match msg.w_param {
                ID_TOGGLE => apply(Hotkey::ToggleEnabled, &switches),
                ID_RECORD => apply(Hotkey::RecordPosition, &switches),
                _ => {}
            }
        }
    });
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
pub fn start_hotkey_listener(_switches: Arc<Switches>) {
    logger::info("global hotkeys unavailable on this platform, use the terminal keys");
}
