use std::time::Instant;

use eframe::egui::{self, Color32, Pos2, Rect, Sense, Stroke, Vec2};
use tracing::warn;

use haptic_spike_audio::audio_engine::AudioEngine;
use haptic_spike_audio::{
    AudioSink, Flow, HapticConfig, HapticError, Material, NeuronId, NullSink, PipelineCommand,
    PipelineCoordinator, PointerInput,
};

/// Ticks simulated per frame at most; a stalled frame does not replay the gap.
const MAX_TICKS_PER_FRAME: u64 = 100;
const TRACE_COLORS: [Color32; 3] = [
    Color32::from_rgb(90, 170, 250),
    Color32::from_rgb(250, 170, 60),
    Color32::from_rgb(120, 220, 120),
];

pub struct HapticApp {
    pipeline: PipelineCoordinator<Box<dyn AudioSink>>,
    device: Option<(String, u32)>,
    audio_error: Option<String>,
    pointer: PointerInput,
    last_frame: Instant,
    pending_ticks: f32,
    status: Option<String>,
}

impl HapticApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: HapticConfig) -> Result<Self, HapticError> {
        let (sink, device, audio_error): (Box<dyn AudioSink>, _, _) =
            match AudioEngine::new(config.sample_rate) {
                Ok(engine) => {
                    let device = Some((engine.device_name.clone(), engine.sample_rate));
                    (Box::new(engine), device, None)
                }
                Err(err) => {
                    warn!(error = %err, "running without audio output");
                    (Box::new(NullSink), None, Some(err.to_string()))
                }
            };

        let pipeline = PipelineCoordinator::new(config, sink)?;

        Ok(Self {
            pipeline,
            device,
            audio_error,
            pointer: PointerInput::default(),
            last_frame: Instant::now(),
            pending_ticks: 0.0,
            status: None,
        })
    }

    fn run_ticks(&mut self) {
        let now = Instant::now();
        let elapsed_ms = now.duration_since(self.last_frame).as_secs_f32() * 1000.0;
        self.last_frame = now;

        self.pending_ticks += elapsed_ms / self.pipeline.config().tick_ms;
        let due = (self.pending_ticks.floor() as u64).min(MAX_TICKS_PER_FRAME);
        self.pending_ticks = (self.pending_ticks - due as f32).min(1.0);
        for _ in 0..due {
            self.pipeline.tick(self.pointer);
        }
    }

    fn handle_keys(&mut self, ctx: &egui::Context) {
        let typed: Vec<char> = ctx.input(|input| {
            input
                .events
                .iter()
                .filter_map(|event| match event {
                    egui::Event::Text(text) => Some(text.chars().collect::<Vec<_>>()),
                    _ => None,
                })
                .flatten()
                .collect()
        });

        for key in typed {
            if let Some(command) = PipelineCommand::from_key(key) {
                self.dispatch(ctx, command);
            }
        }
    }

    fn dispatch(&mut self, ctx: &egui::Context, command: PipelineCommand) {
        match self.pipeline.apply(command) {
            Ok(Flow::Quit) => ctx.send_viewport_cmd(egui::ViewportCommand::Close),
            Ok(Flow::Continue) => self.status = None,
            Err(err) => self.status = Some(err.to_string()),
        }
    }

    fn draw_controls(&mut self, ui: &mut egui::Ui) {
        let snapshot = self.pipeline.snapshot();

        ui.heading("Material");
        for material in Material::ALL {
            let label = format!("{}  {}", material.selector(), material);
            if ui
                .selectable_label(snapshot.material == material, label)
                .clicked()
            {
                self.dispatch(ui.ctx(), PipelineCommand::SelectMaterial(material.selector()));
            }
        }
        ui.label(format!("roughness: {:.2}", snapshot.roughness));

        ui.separator();
        ui.heading("Volume");
        ui.horizontal(|ui| {
            if ui.button("-").clicked() {
                self.dispatch(ui.ctx(), PipelineCommand::VolumeDown);
            }
            ui.label(format!("master {:.1}", snapshot.master_volume));
            if ui.button("+").clicked() {
                self.dispatch(ui.ctx(), PipelineCommand::VolumeUp);
            }
        });
        ui.label(format!("background {:.2}", snapshot.background_volume));
        ui.label(format!("click {:.2}", snapshot.click_volume));
        ui.label(format!(
            "texture {:.3} -> {:.3}",
            snapshot.texture_volume, snapshot.texture_target
        ));
        if ui.button("Reset").clicked() {
            self.dispatch(ui.ctx(), PipelineCommand::Reset);
        }

        ui.separator();
        ui.heading("Receptors");
        for id in NeuronId::ALL {
            let neuron = snapshot.neuron(id);
            ui.colored_label(
                TRACE_COLORS[id.index()],
                format!(
                    "{id}: v {:.1}  u {:.1}  {:.0} Hz",
                    neuron.v, neuron.u, neuron.rate_hz
                ),
            );
        }
        ui.label(format!("speed: {:.0} px/s", snapshot.speed));
        ui.label(format!("tick: {}", snapshot.tick));
        if snapshot.fault_count > 0 {
            ui.label(format!("recovered faults: {}", snapshot.fault_count));
        }

        ui.separator();
        if let Some((name, rate)) = &self.device {
            ui.label(format!("Audio device: {name}"));
            ui.label(format!("Sample rate: {rate} Hz"));
        } else if let Some(err) = &self.audio_error {
            ui.colored_label(
                Color32::from_rgb(230, 100, 100),
                format!("Audio offline: {err}"),
            );
        }
        if !snapshot.audio_online {
            ui.colored_label(Color32::from_rgb(230, 100, 100), "Audio output lost");
        }
        if let Some(status) = &self.status {
            ui.label(status);
        }
        ui.small("keys: 1-7 material, +/- volume, r reset, q quit");
    }

    fn draw_surface(&mut self, ui: &mut egui::Ui) {
        let size = Vec2::new(ui.available_width(), (ui.available_height() * 0.45).max(120.0));
        let (response, painter) = ui.allocate_painter(size, Sense::click_and_drag());
        let rect = response.rect;
        painter.rect_filled(rect, 4.0, Color32::from_gray(28));
        painter.text(
            rect.left_top() + Vec2::new(8.0, 8.0),
            egui::Align2::LEFT_TOP,
            "press and drag to touch",
            egui::FontId::proportional(14.0),
            Color32::from_gray(140),
        );

        let (pos, down) = ui.ctx().input(|input| {
            (input.pointer.latest_pos(), input.pointer.primary_down())
        });
        if let Some(pos) = pos {
            let inside = rect.contains(pos);
            self.pointer = PointerInput::new(pos.x, pos.y, down && inside);
            if inside && down {
                painter.circle_filled(pos, 6.0, Color32::from_rgb(250, 120, 90));
            }
        } else {
            self.pointer.button_down = false;
        }
    }

    fn draw_traces(&self, ui: &mut egui::Ui) {
        let history = self.pipeline.history();
        let height = (ui.available_height() / 3.0 - 6.0).max(40.0);

        for id in NeuronId::ALL {
            let (response, painter) =
                ui.allocate_painter(Vec2::new(ui.available_width(), height), Sense::hover());
            let rect = response.rect;
            painter.rect_filled(rect, 2.0, Color32::from_gray(18));
            painter.text(
                rect.left_top() + Vec2::new(6.0, 4.0),
                egui::Align2::LEFT_TOP,
                id.label(),
                egui::FontId::monospace(12.0),
                TRACE_COLORS[id.index()],
            );

            let trace = history.trace(id);
            let capacity = history.capacity().max(2) as f32;
            let points: Vec<Pos2> = trace
                .iter()
                .enumerate()
                .map(|(i, sample)| {
                    let x = rect.left() + rect.width() * i as f32 / (capacity - 1.0);
                    membrane_to_y(sample.v, rect, sample.fired)
                        .map_or(Pos2::new(x, rect.bottom()), |y| Pos2::new(x, y))
                })
                .collect();
            painter.add(egui::Shape::line(
                points,
                Stroke::new(1.5, TRACE_COLORS[id.index()]),
            ));
        }
    }
}

/// Maps a membrane potential in [-80, 30] mV onto the plot; spikes hit the top.
fn membrane_to_y(v: f32, rect: Rect, fired: bool) -> Option<f32> {
    if !v.is_finite() {
        return None;
    }
    let v = if fired { 30.0 } else { v.clamp(-80.0, 30.0) };
    let t = (v + 80.0) / 110.0;
    Some(rect.bottom() - t * rect.height())
}

impl eframe::App for HapticApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_keys(ctx);
        self.run_ticks();

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(260.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical()
                    .auto_shrink([false, false])
                    .show(ui, |ui| {
                        self.draw_controls(ui);
                    });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.draw_surface(ui);
            ui.separator();
            self.draw_traces(ui);
        });

        ctx.request_repaint();
    }
}
