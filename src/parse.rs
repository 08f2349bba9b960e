use crate::error::{FormatError, LoadError, Result};
use crate::skeleton::*;
use crate::types::*;
use log::{debug, info, trace};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

fn re_frames() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^Frames:\s*(\S+)$").expect("static regex"))
}

fn re_frame_time() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^Frame\s+Time:\s*(\S+)$").expect("static regex"))
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, Copy)]
struct Token<'a> {
    text: &'a str,
    line: usize,
}

enum ChannelKind {
    Position,
    Rotation,
}

fn classify_channel(tag: &str) -> Option<(ChannelKind, Axis)> {
    const TAGS: [(&str, ChannelKind, Axis); 6] = [
        ("Xposition", ChannelKind::Position, Axis::X),
        ("Yposition", ChannelKind::Position, Axis::Y),
        ("Zposition", ChannelKind::Position, Axis::Z),
        ("Xrotation", ChannelKind::Rotation, Axis::X),
        ("Yrotation", ChannelKind::Rotation, Axis::Y),
        ("Zrotation", ChannelKind::Rotation, Axis::Z),
    ];
    TAGS.into_iter()
        .find(|(name, _, _)| name.eq_ignore_ascii_case(tag))
        .map(|(_, kind, axis)| (kind, axis))
}

fn parse_number<T: std::str::FromStr>(token: Token) -> Result<T> {
    token.text.parse::<T>().map_err(|_| FormatError::InvalidNumber {
        line: token.line,
        token: token.text.to_string(),
    })
}

/// A finite `f64`; `NaN` and `inf` are not numbers in a .bvh file.
fn parse_real(token: Token) -> Result<f64> {
    parse_number::<f64>(token)
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| FormatError::InvalidNumber {
            line: token.line,
            token: token.text.to_string(),
        })
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Recursive-descent parser over the whitespace-separated tokens of the HIERARCHY section.
/// Joint ids and channel columns are handed out in the order blocks are encountered,
/// which is the order the MOTION columns appear in.
struct HierarchyParser<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
    next_id: Index,
    next_column: Index,
}

impl<'a> HierarchyParser<'a> {
    fn new(lines: &[(usize, &'a str)]) -> Self {
        let tokens = lines
            .iter()
            .flat_map(|&(line, text)| text.split_whitespace().map(move |text| Token { text, line }))
            .collect();
        HierarchyParser {
            tokens,
            pos: 0,
            next_id: 0,
            next_column: 0,
        }
    }

    fn peek(&self) -> Option<Token<'a>> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self, expected: &str) -> Result<Token<'a>> {
        let token = self.peek().ok_or_else(|| FormatError::UnexpectedEof {
            expected: expected.to_string(),
        })?;
        self.pos += 1;
        Ok(token)
    }

    fn expect(&mut self, keyword: &str) -> Result<Token<'a>> {
        let token = self.next(keyword)?;
        if token.text != keyword {
            return Err(unexpected(token, keyword));
        }
        Ok(token)
    }

    /// Every token left on `line`, up to an opening brace.
    fn rest_of_line(&mut self, line: usize) -> Vec<Token<'a>> {
        let mut rest = Vec::new();
        while let Some(token) = self.peek() {
            if token.line != line || token.text == "{" {
                break;
            }
            rest.push(token);
            self.pos += 1;
        }
        rest
    }

    fn parse(mut self) -> Result<(Joint, usize)> {
        let first = self.next("HIERARCHY")?;
        if first.text != "HIERARCHY" {
            return Err(FormatError::MissingSection("HIERARCHY"));
        }
        let root = self.expect("ROOT")?;
        let root = self.parse_joint(root)?;
        if let Some(token) = self.peek() {
            return Err(unexpected(token, "MOTION"));
        }
        Ok((root, self.next_column))
    }

    fn parse_offset(&mut self) -> Result<Position> {
        let x = parse_real(self.next("offset x")?)?;
        let y = parse_real(self.next("offset y")?)?;
        let z = parse_real(self.next("offset z")?)?;
        Ok(Position::new(x, y, z))
    }

    fn parse_channels(
        &mut self,
        keyword: Token<'a>,
        joint: &str,
    ) -> Result<(Option<PositionChannels>, Option<RotationChannels>)> {
        let declared: usize = parse_number(self.next("channel count")?)?;
        let tags = self.rest_of_line(keyword.line);
        if tags.len() != declared {
            return Err(FormatError::ChannelCountMismatch {
                line: keyword.line,
                declared,
                listed: tags.len(),
            });
        }

        let mut position: [Option<Index>; 3] = [None; 3];
        let mut rotation: Vec<(Axis, Index)> = Vec::with_capacity(3);
        for tag in tags {
            let (kind, axis) = classify_channel(tag.text).ok_or_else(|| FormatError::UnknownChannel {
                line: tag.line,
                tag: tag.text.to_string(),
            })?;
            let duplicate = match kind {
                ChannelKind::Position => position[axis.index()].is_some(),
                ChannelKind::Rotation => rotation.iter().any(|&(a, _)| a == axis),
            };
            if duplicate {
                return Err(FormatError::DuplicateChannel {
                    line: tag.line,
                    joint: joint.to_string(),
                    tag: tag.text.to_string(),
                });
            }

            let column = self.next_column;
            self.next_column += 1;
            match kind {
                ChannelKind::Position => position[axis.index()] = Some(column),
                ChannelKind::Rotation => rotation.push((axis, column)),
            }
        }

        let position_count = position.iter().flatten().count();
        let position = match position {
            [Some(x), Some(y), Some(z)] => Some(PositionChannels([x, y, z])),
            [None, None, None] => None,
            _ => {
                return Err(FormatError::IncompleteChannels {
                    line: keyword.line,
                    joint: joint.to_string(),
                    kind: "position",
                    count: position_count,
                })
            }
        };
        let rotation = match rotation.as_slice() {
            &[(a0, c0), (a1, c1), (a2, c2)] => Some(RotationChannels {
                order: RotationOrder([a0, a1, a2]),
                columns: [c0, c1, c2],
            }),
            [] => None,
            partial => {
                return Err(FormatError::IncompleteChannels {
                    line: keyword.line,
                    joint: joint.to_string(),
                    kind: "rotation",
                    count: partial.len(),
                })
            }
        };
        Ok((position, rotation))
    }

    /// `keyword` is the ROOT/JOINT token that opened the block.
    fn parse_joint(&mut self, keyword: Token<'a>) -> Result<Joint> {
        let name_tokens = self.rest_of_line(keyword.line);
        if name_tokens.is_empty() {
            let found = self.peek().map_or("end of input", |t| t.text);
            return Err(FormatError::UnexpectedToken {
                line: keyword.line,
                expected: "joint name".to_string(),
                found: found.to_string(),
            });
        }
        let name = name_tokens.iter().map(|t| t.text).collect::<Vec<_>>().join(" ");
        let id = JointId(self.next_id);
        self.next_id += 1;

        self.expect("{")?;
        let offset = match self.peek() {
            Some(token) if token.text == "OFFSET" => {
                self.pos += 1;
                self.parse_offset()?
            }
            _ => {
                return Err(FormatError::MissingOffset {
                    line: keyword.line,
                    joint: name,
                })
            }
        };
        let (position_channels, rotation_channels) = match self.peek() {
            Some(token) if token.text == "CHANNELS" => {
                self.pos += 1;
                self.parse_channels(token, &name)?
            }
            _ => (None, None),
        };

        let mut children = Vec::new();
        loop {
            let token = self.next("JOINT, End Site or }")?;
            match token.text {
                "JOINT" => children.push(Node::Joint(self.parse_joint(token)?)),
                "End" => {
                    self.expect("Site")?;
                    children.push(Node::EndSite(self.parse_end_site()?));
                }
                "}" => break,
                "CHANNELS" => {
                    return Err(FormatError::ChannelsAfterChildren {
                        line: token.line,
                        joint: name,
                    })
                }
                _ => return Err(unexpected(token, "JOINT, End Site or }")),
            }
        }

        let joint = Joint {
            name,
            id,
            offset,
            position_channels,
            rotation_channels,
            children,
        };
        trace!(
            "joint {} '{}' offset {:?} position {:?} rotation {:?}",
            joint.id,
            joint.name,
            joint.offset,
            joint.position_channels,
            joint.rotation_channels
        );
        Ok(joint)
    }

    fn parse_end_site(&mut self) -> Result<EndSite> {
        self.expect("{")?;
        self.expect("OFFSET")?;
        let offset = self.parse_offset()?;
        self.expect("}")?;
        Ok(EndSite { offset })
    }
}

fn unexpected(token: Token, expected: &str) -> FormatError {
    FormatError::UnexpectedToken {
        line: token.line,
        expected: expected.to_string(),
        found: token.text.to_string(),
    }
}

///////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

/// Parses `Frames:`, `Frame Time:` and exactly that many rows of `channel_count` numbers.
fn parse_motion(lines: &[(usize, &str)], channel_count: usize) -> Result<Motion> {
    let mut lines = lines
        .iter()
        .map(|&(line, text)| (line, text.trim()))
        .filter(|(_, text)| !text.is_empty());

    let (line, text) = lines.next().ok_or_else(|| FormatError::UnexpectedEof {
        expected: "Frames:".to_string(),
    })?;
    let captures = re_frames().captures(text).ok_or_else(|| FormatError::UnexpectedToken {
        line,
        expected: "Frames:".to_string(),
        found: text.to_string(),
    })?;
    let num_frames: usize = parse_number(Token {
        text: captures.get(1).map_or("", |m| m.as_str()),
        line,
    })?;
    if num_frames == 0 {
        return Err(FormatError::NoFrames);
    }

    let (line, text) = lines.next().ok_or_else(|| FormatError::UnexpectedEof {
        expected: "Frame Time:".to_string(),
    })?;
    let captures = re_frame_time().captures(text).ok_or_else(|| FormatError::UnexpectedToken {
        line,
        expected: "Frame Time:".to_string(),
        found: text.to_string(),
    })?;
    let value = captures.get(1).map_or("", |m| m.as_str());
    let frame_length: f64 = parse_number(Token { text: value, line })?;
    if !frame_length.is_finite() || frame_length <= 0.0 {
        return Err(FormatError::InvalidFrameTime {
            line,
            value: value.to_string(),
        });
    }

    // the Frames: header is not trusted for sizing, rows are counted below
    let mut values = Vec::new();
    let mut found = 0;
    for (line, text) in lines {
        let start = values.len();
        for token in text.split_whitespace() {
            values.push(parse_real(Token { text: token, line })?);
        }
        let row_length = values.len() - start;
        if row_length != channel_count {
            return Err(FormatError::RowLength {
                line,
                expected: channel_count,
                found: row_length,
            });
        }
        found += 1;
    }
    if found != num_frames {
        return Err(FormatError::FrameCountMismatch {
            declared: num_frames,
            found,
        });
    }

    Ok(Motion {
        num_frames,
        frame_length,
        channel_count,
        values,
    })
}

//////////////////////////////////////////////////////////////// PUBLIC ///////////////////////////////////////////////////////////////////////////////////////

/// Parses the text of a .bvh file. Either the whole file is valid or nothing is returned.
pub fn parse(text: &str) -> Result<Skeleton> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let lines: Vec<(usize, &str)> = text.lines().enumerate().map(|(i, l)| (i + 1, l)).collect();

    let motion_start = lines
        .iter()
        .position(|(_, text)| text.split_whitespace().next() == Some("MOTION"))
        .ok_or(FormatError::MissingSection("MOTION"))?;

    let (root, channel_count) = HierarchyParser::new(&lines[..motion_start]).parse()?;
    if channel_count == 0 {
        return Err(FormatError::NoChannels);
    }
    let motion = parse_motion(&lines[motion_start + 1..], channel_count)?;

    let skeleton = Skeleton::new(root, motion);
    debug!(
        "parsed skeleton '{}': {} joints, {} channels, {} frames of {}s",
        skeleton.root().name,
        skeleton.joint_count(),
        skeleton.channel_count(),
        skeleton.num_frames(),
        skeleton.frame_length()
    );
    Ok(skeleton)
}

/// load a skeleton from a string
pub fn load_skeleton(bvh_string: &str) -> Result<Skeleton> {
    parse(bvh_string)
}

/// load a skeleton from a file path
pub fn load_skeleton_from_file<P: AsRef<Path>>(path: P) -> std::result::Result<Skeleton, LoadError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let skeleton = parse(&contents)?;
    info!(
        "loaded {} ({} joints, {} frames at {} fps)",
        path.display(),
        skeleton.joint_count(),
        skeleton.num_frames(),
        skeleton.fps()
    );
    Ok(skeleton)
}
