//! Hand landmark layout.

/// Number of landmarks a hand landmark extractor yields per detected hand.
pub const NUM_LANDMARKS: usize = 21;

/// Names for the hand pose landmarks, in the order the extractor emits them.
///
/// # Terminology
///
/// - **CMC**: [Carpometacarpal joint], the lowest joint of the thumb, located near the wrist.
/// - **MCP**: [Metacarpophalangeal joint], the lower joint forming the knuckles near the palm of
///   the hand.
/// - **PIP**: Proximal Interphalangeal joint, the joint between the MCP and DIP.
/// - **DIP**: Distal Interphalangeal joint, the highest joint of a finger.
/// - **Tip**: This landmark is just placed on the tip of the finger, above the DIP.
///
/// [Carpometacarpal joint]: https://en.wikipedia.org/wiki/Carpometacarpal_joint
/// [Metacarpophalangeal joint]: https://en.wikipedia.org/wiki/Metacarpophalangeal_joint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandmarkIdx {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexFingerMcp,
    IndexFingerPip,
    IndexFingerDip,
    IndexFingerTip,
    MiddleFingerMcp,
    MiddleFingerPip,
    MiddleFingerDip,
    MiddleFingerTip,
    RingFingerMcp,
    RingFingerPip,
    RingFingerDip,
    RingFingerTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

impl LandmarkIdx {
    /// The landmark all other landmarks are measured relative to during normalization.
    pub const ORIGIN: Self = Self::Wrist;

    /// Returns the fingers as `[MCP, PIP/IP, DIP/IP, Tip]` chains, thumb first.
    ///
    /// For the thumb, the CMC takes the place of the MCP.
    pub fn fingers() -> [[LandmarkIdx; 4]; 5] {
        use LandmarkIdx::*;
        [
            [ThumbCmc, ThumbMcp, ThumbIp, ThumbTip],
            [IndexFingerMcp, IndexFingerPip, IndexFingerDip, IndexFingerTip],
            [MiddleFingerMcp, MiddleFingerPip, MiddleFingerDip, MiddleFingerTip],
            [RingFingerMcp, RingFingerPip, RingFingerDip, RingFingerTip],
            [PinkyMcp, PinkyPip, PinkyDip, PinkyTip],
        ]
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}
