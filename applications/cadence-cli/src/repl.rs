//! Line commands read from the terminal

use anyhow::{anyhow, bail, Context, Result};
use cadence_playback::{
    Command, EngineEvent, FocusChange, Placement, RepeatMode, ShuffleMode, TrackRef,
};

pub const HELP: &str = "\
Commands:
  play | pause | toggle | stop | next | prev
  seek MS                      seek within the current track
  open IDS [POS]               replace the queue (IDS like 1,2,3) and play
  enqueue now|next|last IDS    insert tracks
  remove FIRST LAST            remove queue entries FIRST..=LAST
  move FROM TO                 move one queue entry
  jump I                       play queue entry I
  clear                        empty the queue
  shuffle none|normal|auto
  repeat none|current|all
  end                          simulate the end of the current track
  gapless                      simulate a switch to the prefetched track
  focus gain|loss|transient|duck
  queue                        show the queue
  help | quit";

/// What one input line asks for
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Commands for the playback worker, in order
    Send(Vec<Command>),

    /// Move the engine to its prefetched source, then tell the worker
    Gapless,

    /// Print the queue
    ShowQueue,

    Help,
    Quit,

    /// Blank line
    Nothing,
}

/// Parse one input line
pub fn parse(line: &str) -> Result<Action> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&name, args)) = words.split_first() else {
        return Ok(Action::Nothing);
    };

    let send = |command: Command| -> Result<Action> { Ok(Action::Send(vec![command])) };

    match (name, args) {
        ("play", []) => send(Command::Play),
        ("pause", []) => send(Command::Pause),
        ("toggle", []) => send(Command::TogglePause),
        ("stop", []) => send(Command::Stop),
        ("next", []) => send(Command::Next),
        ("prev", []) => send(Command::Previous),
        ("seek", [ms]) => send(Command::Seek(number(ms)?)),
        ("open", [ids]) | ("open", [ids, _]) => {
            let position = match args.get(1) {
                Some(position) => Some(number(position)?),
                None => None,
            };
            Ok(Action::Send(vec![
                Command::Open {
                    tracks: track_list(ids)?,
                    position,
                },
                Command::Play,
            ]))
        }
        ("enqueue", [placement, ids]) => send(Command::Enqueue {
            tracks: track_list(ids)?,
            placement: placement_mode(placement)?,
        }),
        ("remove", [first, last]) => send(Command::RemoveRange {
            first: number(first)?,
            last: number(last)?,
        }),
        ("move", [from, to]) => send(Command::MoveItem {
            from: number(from)?,
            to: number(to)?,
        }),
        ("jump", [index]) => send(Command::SetQueuePosition(number(index)?)),
        ("clear", []) => send(Command::ClearQueue),
        ("shuffle", [mode]) => send(Command::SetShuffle(shuffle_mode(mode)?)),
        ("repeat", [mode]) => send(Command::SetRepeat(repeat_mode(mode)?)),
        ("end", []) => send(Command::Engine(EngineEvent::EndOfTrack)),
        ("gapless", []) => Ok(Action::Gapless),
        ("focus", [change]) => send(Command::Focus(focus_change(change)?)),
        ("queue", []) => Ok(Action::ShowQueue),
        ("help", []) => Ok(Action::Help),
        ("quit" | "exit", []) => Ok(Action::Quit),
        _ => bail!("unknown command: {} (try `help`)", line.trim()),
    }
}

fn number<T: std::str::FromStr>(word: &str) -> Result<T> {
    word.parse().map_err(|_| anyhow!("not a number: {}", word))
}

fn track_list(word: &str) -> Result<Vec<TrackRef>> {
    word.split(',')
        .filter(|id| !id.is_empty())
        .map(|id| number::<u64>(id).map(TrackRef))
        .collect::<Result<Vec<_>>>()
        .context("track list must look like 1,2,3")
}

fn placement_mode(word: &str) -> Result<Placement> {
    match word {
        "now" => Ok(Placement::Now),
        "next" => Ok(Placement::Next),
        "last" => Ok(Placement::Last),
        other => bail!("placement must be now, next or last, not {}", other),
    }
}

fn shuffle_mode(word: &str) -> Result<ShuffleMode> {
    match word {
        "none" | "off" => Ok(ShuffleMode::None),
        "normal" | "on" => Ok(ShuffleMode::Normal),
        "auto" | "party" => Ok(ShuffleMode::Auto),
        other => bail!("unknown shuffle mode: {}", other),
    }
}

fn repeat_mode(word: &str) -> Result<RepeatMode> {
    match word {
        "none" | "off" => Ok(RepeatMode::None),
        "current" | "one" => Ok(RepeatMode::Current),
        "all" => Ok(RepeatMode::All),
        other => bail!("unknown repeat mode: {}", other),
    }
}

fn focus_change(word: &str) -> Result<FocusChange> {
    match word {
        "gain" => Ok(FocusChange::Gain),
        "loss" => Ok(FocusChange::Loss),
        "transient" => Ok(FocusChange::LossTransient),
        "duck" => Ok(FocusChange::LossTransientCanDuck),
        other => bail!("unknown focus change: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_also_plays() {
        assert_eq!(
            parse("open 4,5,6 2").unwrap(),
            Action::Send(vec![
                Command::Open {
                    tracks: vec![TrackRef(4), TrackRef(5), TrackRef(6)],
                    position: Some(2),
                },
                Command::Play,
            ])
        );
        assert_eq!(
            parse("open 9").unwrap(),
            Action::Send(vec![
                Command::Open {
                    tracks: vec![TrackRef(9)],
                    position: None,
                },
                Command::Play,
            ])
        );
    }

    #[test]
    fn parses_arguments() {
        assert_eq!(
            parse("  remove 2 4 ").unwrap(),
            Action::Send(vec![Command::RemoveRange { first: 2, last: 4 }])
        );
        assert_eq!(
            parse("enqueue next 7").unwrap(),
            Action::Send(vec![Command::Enqueue {
                tracks: vec![TrackRef(7)],
                placement: Placement::Next,
            }])
        );
        assert_eq!(
            parse("focus duck").unwrap(),
            Action::Send(vec![Command::Focus(FocusChange::LossTransientCanDuck)])
        );
        assert_eq!(parse("gapless").unwrap(), Action::Gapless);
        assert_eq!(parse("").unwrap(), Action::Nothing);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse("seek soon").is_err());
        assert!(parse("shuffle sideways").is_err());
        assert!(parse("open 1,x,3").is_err());
        assert!(parse("next 3").is_err());
        assert!(parse("dance").is_err());
    }
}
