// src/main.rs - Demo: drive the engine with a synthetic squat session
use anyhow::Result;
use movement_engine::{
    EngineEvent, Joint, Landmark, LandmarkFrame, MovementEngine, PoseLandmark, SessionExporter,
};
use tracing::info;

const FRAME_RATE: f64 = 30.0;
const SESSION_FRAMES: usize = 300;

/// Knee angle for a slow sinusoidal squat: standing near 175 degrees,
/// bottoming out near 90, one cycle every five seconds.
fn knee_angle(t: f64) -> f64 {
    let cycle = (t * std::f64::consts::TAU / 5.0).cos();
    132.5 + 42.5 * cycle
}

/// Frontal standing pose with the right knee driven to the given angle.
fn synthetic_frame(knee_deg: f64, timestamp: f64) -> LandmarkFrame {
    let mut frame = LandmarkFrame::empty(timestamp);
    let set = |frame: &mut LandmarkFrame, index: PoseLandmark, x: f64, y: f64| {
        frame.set(index, Landmark::new(x, y, 0.0, 0.92));
    };
    set(&mut frame, PoseLandmark::Nose, 0.5, 0.15);
    set(&mut frame, PoseLandmark::LeftShoulder, 0.58, 0.3);
    set(&mut frame, PoseLandmark::RightShoulder, 0.42, 0.3);
    set(&mut frame, PoseLandmark::LeftElbow, 0.62, 0.42);
    set(&mut frame, PoseLandmark::RightElbow, 0.38, 0.42);
    set(&mut frame, PoseLandmark::LeftWrist, 0.64, 0.52);
    set(&mut frame, PoseLandmark::RightWrist, 0.36, 0.52);
    set(&mut frame, PoseLandmark::LeftHip, 0.55, 0.5);
    set(&mut frame, PoseLandmark::RightHip, 0.45, 0.5);
    set(&mut frame, PoseLandmark::LeftKnee, 0.55, 0.68);
    set(&mut frame, PoseLandmark::RightKnee, 0.45, 0.68);
    set(&mut frame, PoseLandmark::LeftAnkle, 0.55, 0.86);

    // Swing the right shin around the knee so hip-knee-ankle subtends the
    // requested angle; the thigh points straight up from the knee.
    let shin_bearing = -std::f64::consts::FRAC_PI_2 + knee_deg.to_radians();
    frame.set(
        PoseLandmark::RightAnkle,
        Landmark::new(
            0.45 + shin_bearing.cos() * 0.18,
            0.68 + shin_bearing.sin() * 0.18,
            0.0,
            0.92,
        ),
    );
    frame
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let mut engine = MovementEngine::with_defaults()?;
    let mut exporter = SessionExporter::new("./output", None);

    info!(frames = SESSION_FRAMES, "starting synthetic squat session");

    let mut last_rom = 0.0;
    for i in 0..SESSION_FRAMES {
        let timestamp = i as f64 / FRAME_RATE;
        let frame = synthetic_frame(knee_angle(timestamp), timestamp);
        let output = engine.process_frame(&frame);

        for event in &output.events {
            match event {
                EngineEvent::PhaseChanged {
                    exercise,
                    from_phase,
                    to_phase,
                    ..
                } => info!(%exercise, %from_phase, %to_phase, "phase changed"),
                EngineEvent::RepCompleted {
                    exercise,
                    rep_count,
                    form_score,
                    range_of_motion,
                    ..
                } => info!(
                    %exercise,
                    rep_count,
                    form_score,
                    rom_deg = range_of_motion,
                    "rep completed"
                ),
                EngineEvent::FormWarning {
                    exercise, messages, ..
                } => info!(%exercise, ?messages, "form warning"),
            }
        }

        last_rom = output.snapshot.range_of_motion(Joint::RightKnee);
        exporter.add_frame(&output.snapshot, &output.events);
    }

    let csv_path = exporter.export_csv()?;
    let summary_path = exporter.write_summary()?;

    println!("Session complete:");
    println!("  reps:        {}", engine.exercise_state().rep_count());
    println!("  form score:  {:.1}", engine.exercise_state().form_score());
    println!("  knee ROM:    {:.1} deg (recent window)", last_rom);
    println!("  metrics csv: {}", csv_path.display());
    println!("  summary:     {}", summary_path.display());

    Ok(())
}
