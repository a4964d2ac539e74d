use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::error::SimulationError;
use crate::gpu::GpuState;
use crate::simulation::Simulation;
use crate::time::Time;

/// Frames between window title refreshes.
const TITLE_INTERVAL: u64 = 60;

/// Run `simulation` in a window until it is closed.
pub(crate) fn run(simulation: Simulation) -> Result<(), SimulationError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(simulation);
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

struct App {
    simulation: Simulation,
    window: Option<Arc<Window>>,
    gpu_state: Option<GpuState>,
    time: Time,
    error: Option<SimulationError>,
}

impl App {
    fn new(simulation: Simulation) -> Self {
        Self {
            simulation,
            window: None,
            gpu_state: None,
            time: Time::new(),
            error: None,
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: SimulationError) {
        log::error!("{}", err);
        self.error = Some(err);
        event_loop.exit();
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<(), SimulationError> {
        let settings = &self.simulation.config().window;
        let window_attrs = Window::default_attributes()
            .with_title(settings.title.clone())
            .with_inner_size(winit::dpi::LogicalSize::new(settings.width, settings.height));

        let window = Arc::new(event_loop.create_window(window_attrs)?);
        self.window = Some(window.clone());
        self.gpu_state = Some(pollster::block_on(GpuState::new(
            window,
            self.simulation.world().particles.capacity(),
            settings,
        ))?);

        // Setup time is not simulation time.
        self.time = Time::new();
        Ok(())
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let elapsed = self.time.update();
        let stats = match self.simulation.frame(elapsed) {
            Ok(stats) => stats,
            Err(err) => return self.fail(event_loop, err),
        };

        if let Some(gpu_state) = &mut self.gpu_state {
            gpu_state.upload(self.simulation.instances());
            match gpu_state.render() {
                Ok(_) => {}
                Err(wgpu::SurfaceError::Lost) => gpu_state.resize(winit::dpi::PhysicalSize {
                    width: gpu_state.config.width,
                    height: gpu_state.config.height,
                }),
                Err(wgpu::SurfaceError::OutOfMemory) => event_loop.exit(),
                Err(e) => log::warn!("render error: {:?}", e),
            }
        }

        if let Some(window) = &self.window {
            if self.time.frame() % TITLE_INTERVAL == 0 {
                window.set_title(&format!(
                    "{} - {:.0} fps - {} particles - t={:.1}s",
                    self.simulation.config().window.title,
                    self.time.fps(),
                    stats.instance_count,
                    stats.sim_time,
                ));
            }
            window.request_redraw();
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(err) = self.init(event_loop) {
                self.fail(event_loop, err);
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => match code {
                KeyCode::Escape => event_loop.exit(),
                KeyCode::Space => {
                    self.time.toggle_pause();
                    log::info!("paused: {}", self.time.is_paused());
                }
                _ => {}
            },
            WindowEvent::Resized(physical_size) => {
                if let Some(gpu_state) = &mut self.gpu_state {
                    gpu_state.resize(physical_size);
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }
}
