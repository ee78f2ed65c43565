use haptic_spike_audio::{
    AudioCommand, HapticConfig, HapticError, Material, NeuronId, PipelineCommand,
    PipelineCoordinator, PointerInput, RecordingSink, SinkError, Voice,
};

fn pipeline() -> PipelineCoordinator<RecordingSink> {
    let mut pipeline =
        PipelineCoordinator::new(HapticConfig::default(), RecordingSink::new()).unwrap();
    pipeline.sink_mut().take();
    pipeline
}

/// Presses at a fixed spot, then drags right by `step` px per tick.
fn press_and_drag(pipeline: &mut PipelineCoordinator<RecordingSink>, ticks: u64, step: f32) {
    for i in 0..ticks {
        pipeline.tick(PointerInput::new(i as f32 * step, 100.0, true));
    }
}

fn release(pipeline: &mut PipelineCoordinator<RecordingSink>, ticks: u64) {
    for _ in 0..ticks {
        pipeline.tick(PointerInput::new(0.0, 100.0, false));
    }
}

#[test]
fn stationary_press_drives_sa_and_click_only() {
    let mut pipeline = pipeline();
    let mut spikes = [Vec::new(), Vec::new(), Vec::new()];

    for tick in 0..60 {
        let input = PointerInput::new(40.0, 40.0, tick < 50);
        let report = pipeline.tick(input);
        for spike in report.spikes() {
            spikes[spike.neuron.index()].push(spike.tick);
        }
    }

    assert_eq!(spikes[NeuronId::Sa.index()], vec![3, 27, 46]);
    assert!(spikes[NeuronId::RaMotion.index()].is_empty());
    assert_eq!(spikes[NeuronId::RaClick.index()], vec![1, 51]);

    let commands = pipeline.sink().commands();
    let background: Vec<f32> = commands
        .iter()
        .filter_map(|c| match c {
            AudioCommand::Trigger {
                voice: Voice::Background,
                gain,
                ..
            } => Some(*gain),
            _ => None,
        })
        .collect();
    assert_eq!(background, vec![0.3; 3]);

    let clicks = commands
        .iter()
        .filter(|c| {
            matches!(c, AudioCommand::Trigger { voice: Voice::Click, gain, .. } if *gain == 1.0)
        })
        .count();
    assert_eq!(clicks, 2);
    assert!(!commands
        .iter()
        .any(|c| matches!(c, AudioCommand::Loop { .. })));

    let snapshot = pipeline.snapshot();
    assert_eq!(snapshot.neuron(NeuronId::Sa).last_spike, Some(46));
    assert_eq!(snapshot.neuron(NeuronId::RaClick).last_spike, Some(51));
    assert_eq!(snapshot.neuron(NeuronId::RaMotion).last_spike, None);
}

#[test]
fn fast_drag_on_wood_reaches_the_loud_texture() {
    let mut pipeline = pipeline();
    pipeline.apply(PipelineCommand::SelectMaterial(3)).unwrap();
    press_and_drag(&mut pipeline, 1_200, 2.0);

    let loops: Vec<&AudioCommand> = pipeline
        .sink()
        .commands()
        .iter()
        .filter(|c| matches!(c, AudioCommand::Loop { .. }))
        .collect();
    assert_eq!(loops.len(), 1);

    let snapshot = pipeline.snapshot();
    assert_eq!(snapshot.material, Material::Wood);
    assert!(snapshot.neuron(NeuronId::RaMotion).rate_hz > 120.0);
    assert_eq!(snapshot.texture_target, 0.8);
    assert!(snapshot.texture_volume > 0.75);
    assert!(snapshot.speed > 1_900.0 && snapshot.speed < 2_100.0);
    assert!(pipeline.renderer().texture_playing());

    pipeline.sink_mut().take();
    release(&mut pipeline, 600);
    assert!(pipeline.sink().commands().contains(&AudioCommand::Stop {
        voice: Voice::Texture
    }));
    assert!(!pipeline.renderer().texture_playing());
}

#[test]
fn hovering_never_touches_click_or_texture() {
    let mut pipeline = pipeline();
    for i in 0..500 {
        pipeline.tick(PointerInput::new(i as f32 * 3.0, 50.0, false));
    }
    assert_eq!(pipeline.snapshot().speed, 0.0);
    assert!(pipeline.sink().commands().iter().all(|c| matches!(
        c,
        AudioCommand::Trigger {
            voice: Voice::Background,
            ..
        }
    )));
}

#[test]
fn reset_matches_a_fresh_pipeline() {
    let mut used = pipeline();
    used.apply(PipelineCommand::SelectMaterial(2)).unwrap();
    press_and_drag(&mut used, 700, 1.5);
    release(&mut used, 40);
    used.apply(PipelineCommand::Reset).unwrap();
    assert_eq!(used.sink_mut().take().last(), Some(&AudioCommand::StopAll));
    assert_eq!(used.ticks(), 0);
    assert!(used.history().is_empty());

    let mut fresh = pipeline();
    fresh.apply(PipelineCommand::SelectMaterial(2)).unwrap();
    fresh.sink_mut().take();

    assert_eq!(*used.snapshot(), *fresh.snapshot());
    assert_eq!(
        used.renderer().texture_volume(),
        fresh.renderer().texture_volume()
    );
    assert_eq!(used.renderer().motion_rate_hz(), 0.0);
    assert!(!used.renderer().texture_playing());

    for pipeline in [&mut used, &mut fresh] {
        press_and_drag(pipeline, 400, 1.0);
        release(pipeline, 24);
    }

    assert_eq!(used.sink().commands(), fresh.sink().commands());
    assert_eq!(*used.snapshot(), *fresh.snapshot());
    assert_eq!(
        used.history().trace(NeuronId::Sa),
        fresh.history().trace(NeuronId::Sa)
    );
    assert_eq!(used.neurons().states(), fresh.neurons().states());
}

#[test]
fn identical_input_gives_identical_output() {
    let mut a = pipeline();
    let mut b = pipeline();
    for pipeline in [&mut a, &mut b] {
        pipeline.apply(PipelineCommand::SelectMaterial(5)).unwrap();
        for i in 0..900 {
            let x = (i as f32 * 0.37).sin() * 200.0;
            pipeline.tick(PointerInput::new(x, 10.0, i % 300 < 200));
        }
    }
    assert_eq!(a.sink().commands(), b.sink().commands());
    assert_eq!(*a.snapshot(), *b.snapshot());
}

#[test]
fn unknown_selector_is_rejected_without_side_effects() {
    let mut pipeline = pipeline();
    pipeline.apply(PipelineCommand::SelectMaterial(6)).unwrap();
    let before = pipeline.snapshot();

    let err = pipeline.apply(PipelineCommand::SelectMaterial(0)).unwrap_err();
    assert!(matches!(err, HapticError::UnknownMaterial { selector: 0 }));
    assert_eq!(pipeline.material(), Material::Ceramic);
    assert_eq!(*pipeline.snapshot(), *before);
}

#[test]
fn lost_audio_output_does_not_stop_the_loop() {
    let sink = RecordingSink::failing(SinkError::Unavailable("no device".into()));
    let mut pipeline = PipelineCoordinator::new(HapticConfig::default(), sink).unwrap();
    assert!(!pipeline.audio_online());

    for _ in 0..64 {
        pipeline.tick(PointerInput::new(0.0, 0.0, true));
    }
    assert_eq!(pipeline.ticks(), 64);
    assert!(!pipeline.snapshot().audio_online);
    assert!(pipeline.sink().commands().is_empty());

    pipeline.sink_mut().set_failure(None);
    pipeline.apply(PipelineCommand::VolumeDown).unwrap();
    assert!(pipeline.audio_online());
    assert!(pipeline.snapshot().audio_online);
}

#[test]
fn saturated_sink_drops_commands_but_stays_online() {
    let sink = RecordingSink::failing(SinkError::Saturated);
    let mut pipeline = PipelineCoordinator::new(HapticConfig::default(), sink).unwrap();
    for _ in 0..40 {
        pipeline.tick(PointerInput::new(0.0, 0.0, true));
    }
    assert!(pipeline.audio_online());
}

#[test]
fn dropped_texture_loop_is_sent_again_once_the_queue_drains() {
    let sink = RecordingSink::failing(SinkError::Saturated);
    let mut pipeline = PipelineCoordinator::new(HapticConfig::default(), sink).unwrap();
    pipeline.apply(PipelineCommand::SelectMaterial(3)).unwrap();
    press_and_drag(&mut pipeline, 300, 1.0);
    assert!(pipeline.renderer().motion_rate_hz() > 0.0);
    assert!(!pipeline.renderer().texture_playing());

    pipeline.sink_mut().set_failure(None);
    for i in 300..320 {
        pipeline.tick(PointerInput::new(i as f32, 100.0, true));
    }
    let loops = pipeline
        .sink()
        .commands()
        .iter()
        .filter(|c| matches!(c, AudioCommand::Loop { .. }))
        .count();
    assert_eq!(loops, 1);
    assert!(pipeline.renderer().texture_playing());
}

#[test]
fn lifting_the_finger_silences_the_texture_within_a_tick() {
    let mut pipeline = pipeline();
    pipeline.apply(PipelineCommand::SelectMaterial(3)).unwrap();
    press_and_drag(&mut pipeline, 1_200, 2.0);
    assert!(pipeline.renderer().texture_volume().current > 0.75);
    pipeline.sink_mut().take();

    pipeline.tick(PointerInput::new(2_400.0, 100.0, false));
    let texture: Vec<&AudioCommand> = pipeline
        .sink()
        .commands()
        .iter()
        .filter(|c| {
            matches!(
                c,
                AudioCommand::Gain {
                    voice: Voice::Texture,
                    ..
                } | AudioCommand::Stop {
                    voice: Voice::Texture
                } | AudioCommand::Loop { .. }
            )
        })
        .collect();
    assert_eq!(
        texture,
        [
            &AudioCommand::Gain {
                voice: Voice::Texture,
                gain: 0.0
            },
            &AudioCommand::Stop {
                voice: Voice::Texture
            },
        ]
    );
    assert_eq!(pipeline.renderer().texture_volume().current, 0.0);
}

#[test]
fn corrupted_neuron_is_recovered_and_counted() {
    let mut pipeline = pipeline();
    pipeline
        .neurons_mut()
        .inject(NeuronId::RaMotion, f32::INFINITY, 0.0);
    let report = pipeline.tick(PointerInput::default());
    assert_eq!(report.step.faults, [false, true, false]);
    assert!(!report.step.fired(NeuronId::RaMotion));

    for _ in 0..7 {
        pipeline.tick(PointerInput::default());
    }
    let snapshot = pipeline.snapshot();
    assert_eq!(snapshot.fault_count, 1);
    assert!(snapshot.neuron(NeuronId::RaMotion).v.is_finite());
}

#[test]
fn history_is_bounded_by_capacity() {
    let mut pipeline = pipeline();
    press_and_drag(&mut pipeline, 800, 1.0);
    assert_eq!(pipeline.history().len(), 500);
    assert_eq!(pipeline.history().capacity(), 500);
}

#[test]
fn material_switch_mid_drag_swaps_the_texture_loop() {
    let mut pipeline = pipeline();
    pipeline.apply(PipelineCommand::SelectMaterial(2)).unwrap();
    press_and_drag(&mut pipeline, 300, 1.0);
    pipeline.sink_mut().take();

    pipeline.apply(PipelineCommand::SelectMaterial(7)).unwrap();
    for i in 300..320 {
        pipeline.tick(PointerInput::new(i as f32, 100.0, true));
    }
    let loops = pipeline
        .sink()
        .commands()
        .iter()
        .filter(|c| matches!(c, AudioCommand::Loop { .. }))
        .count();
    assert_eq!(loops, 1);
}
