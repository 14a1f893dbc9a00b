/// Entry point and game loop.

mod config;
mod domain;
mod hint;
mod sim;
mod ui;

use std::time::{Duration, Instant};

use config::GameConfig;
use sim::catalog::load_catalog;
use sim::session::Session;
use ui::editor::{Command, Editor, EditorView};
use ui::gamepad::GamepadState;
use ui::input::{key_action, InputState, KeyAction};
use ui::renderer::Renderer;
use ui::sound::{play_events, SoundEngine};

const FRAME_SLEEP: Duration = Duration::from_millis(5);

fn main() {
    // Warnings about config/catalog files print here, before raw mode.
    let config = GameConfig::load();
    let catalog = load_catalog(&config.levels_file);
    let hints = hint::source_from_config(&config);
    let mut session = Session::new(catalog, hints);

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let sound = SoundEngine::new();

    let result = game_loop(&mut session, &mut renderer, sound.as_ref(), &config);
    session.teardown();

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        eprintln!("Game error: {e}");
    }
    if let Some(diag) = session.last_diagnostic() {
        eprintln!("Hint service: {diag}");
    }

    let snap = session.snapshot();
    println!();
    println!("Thanks for playing Code Quest!");
    println!("Reached level {} of {}", snap.level_index + 1, snap.level_count);
}

fn game_loop(
    session: &mut Session,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);
    let mut editor = Editor::new();

    loop {
        kb.drain_events();
        gp.update();

        if kb.ctrl_c_pressed() {
            break;
        }

        let actions: Vec<KeyAction> = kb.presses()
            .iter()
            .filter_map(key_action)
            .chain(gp.actions())
            .collect();
        if handle_actions(session, &mut editor, &actions) {
            break;
        }

        session.tick(Instant::now());

        let events = session.drain_events();
        if let Some(sfx) = sound {
            play_events(sfx, &events);
        }

        let snap = session.snapshot();
        editor.clamp(snap.level.available_blocks.len(), snap.program.len());
        renderer.render(&snap, &editor, gp.connected)?;

        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

/// Feed this frame's actions through the editor. Returns true to quit.
fn handle_actions(session: &mut Session, editor: &mut Editor, actions: &[KeyAction]) -> bool {
    for &action in actions {
        let command = {
            let snap = session.snapshot();
            let view = EditorView {
                palette: &snap.level.available_blocks,
                program_len: snap.program.len(),
                overlay_open: snap.briefing || snap.hint.is_some(),
            };
            editor.handle(action, &view)
        };
        let Some(command) = command else { continue };

        match command {
            Command::Add(block) => {
                session.add_block(block);
            }
            Command::Remove(index) => {
                session.remove_block(index);
            }
            Command::Run => {
                session.execute(Instant::now());
            }
            Command::Reset => session.reset_level(),
            Command::Next => {
                if session.advance_level() {
                    editor.home();
                }
            }
            Command::Hint => {
                session.request_hint();
            }
            Command::OpenBriefing => session.open_briefing(),
            Command::CloseOverlay => {
                if session.snapshot().briefing {
                    session.close_briefing();
                } else {
                    session.dismiss_hint();
                }
            }
            Command::Quit => return true,
        }
    }
    false
}
