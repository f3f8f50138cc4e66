use super::WindowStyleFlags;
use crate::debug_if_enabled;
use crate::error::Result;
use crate::events::WindowHandle;
use crate::services::platform::WindowPlatform;

/// Снимает рамку, заголовок и возможность ресайза (read-modify-write стиля).
///
/// Запись выполняется всегда, даже если биты уже сброшены: повторный вызов
/// ничего не меняет. Возвращает записанный стиль.
pub fn strip_decorations(
    platform: &dyn WindowPlatform,
    handle: WindowHandle,
) -> Result<WindowStyleFlags> {
    let before = platform.read_window_style(handle)?;
    debug_if_enabled!(
        "Стиль {} до снятия рамки: рамка {}, заголовок {}",
        handle,
        before.has_border(),
        before.has_caption()
    );

    let stripped = before.without_decorations();
    platform.write_window_style(handle, stripped)?;

    if tracing::enabled!(tracing::Level::DEBUG) {
        match platform.read_window_style(handle) {
            Ok(after) => tracing::debug!(
                "Стиль {} после снятия рамки: рамка {}, заголовок {}",
                handle,
                after.has_border(),
                after.has_caption()
            ),
            Err(e) => tracing::debug!("Не удалось перечитать стиль {}: {}", handle, e),
        }
    }

    Ok(stripped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::services::platform::simulated::{WriteRecord, SIMULATED_HANDLE};
    use crate::services::platform::SimulatedPlatform;

    #[test]
    fn strips_decorations_and_keeps_other_bits() {
        let platform = SimulatedPlatform::from_config(&Config::default().simulation, "umamusume");
        let visible = WindowStyleFlags::from_bits(0x1000_0000);
        let mut window = platform.window().unwrap();
        window.style = window.style | visible;
        platform.spawn_window(window);

        let written = strip_decorations(&platform, SIMULATED_HANDLE).unwrap();

        assert_eq!(written, visible);
        assert_eq!(platform.window().unwrap().style, visible);
    }

    #[test]
    fn second_strip_is_a_harmless_rewrite() {
        let platform = SimulatedPlatform::from_config(&Config::default().simulation, "umamusume");

        let first = strip_decorations(&platform, SIMULATED_HANDLE).unwrap();
        let second = strip_decorations(&platform, SIMULATED_HANDLE).unwrap();

        assert_eq!(first, second);
        assert_eq!(
            platform.writes(),
            vec![
                WriteRecord::Style { handle: SIMULATED_HANDLE, flags: first },
                WriteRecord::Style { handle: SIMULATED_HANDLE, flags: second },
            ]
        );
    }

    #[test]
    fn missing_window_propagates_error() {
        let platform = SimulatedPlatform::from_config(&Config::default().simulation, "umamusume");
        platform.close_window();

        assert!(strip_decorations(&platform, SIMULATED_HANDLE).is_err());
        assert!(platform.writes().is_empty());
    }
}
