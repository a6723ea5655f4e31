use vgl::{Context, ContextConfig, WindowConfig};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => ContextConfig::load(path)?,
        None => ContextConfig {
            window: WindowConfig::new(1920, 1080, "Window Title"),
            ..ContextConfig::default()
        },
    };

    let mut context = Context::new(config)?;
    log::info!(
        "running on {} with {:?} MSAA",
        context.physical_device().name,
        context.physical_device().msaa_samples
    );

    while context.is_open() {
        context.poll_events();
        if context.window.take_resized() {
            log::debug!("framebuffer resized");
        }
        std::thread::sleep(std::time::Duration::from_millis(1));
    }

    Ok(())
}
