use std::fmt;

/// Binary operators of infix expressions.
///
/// Variants are listed from the tightest to the loosest binding group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InfixOp {
    Times,
    Divide,
    Remainder,
    Plus,
    Minus,
    LeftShift,
    RightShiftSigned,
    RightShiftUnsigned,
    Less,
    Greater,
    LessEquals,
    GreaterEquals,
    Equals,
    NotEquals,
    BitAnd,
    Xor,
    BitOr,
    ConditionalAnd,
    ConditionalOr,
}

impl InfixOp {
    pub fn as_str(self) -> &'static str {
        match self {
            InfixOp::Times => "*",
            InfixOp::Divide => "/",
            InfixOp::Remainder => "%",
            InfixOp::Plus => "+",
            InfixOp::Minus => "-",
            InfixOp::LeftShift => "<<",
            InfixOp::RightShiftSigned => ">>",
            InfixOp::RightShiftUnsigned => ">>>",
            InfixOp::Less => "<",
            InfixOp::Greater => ">",
            InfixOp::LessEquals => "<=",
            InfixOp::GreaterEquals => ">=",
            InfixOp::Equals => "==",
            InfixOp::NotEquals => "!=",
            InfixOp::BitAnd => "&",
            InfixOp::Xor => "^",
            InfixOp::BitOr => "|",
            InfixOp::ConditionalAnd => "&&",
            InfixOp::ConditionalOr => "||",
        }
    }

    pub fn from_token(token: &str) -> Option<InfixOp> {
        Some(match token {
            "*" => InfixOp::Times,
            "/" => InfixOp::Divide,
            "%" => InfixOp::Remainder,
            "+" => InfixOp::Plus,
            "-" => InfixOp::Minus,
            "<<" => InfixOp::LeftShift,
            ">>" => InfixOp::RightShiftSigned,
            ">>>" => InfixOp::RightShiftUnsigned,
            "<" => InfixOp::Less,
            ">" => InfixOp::Greater,
            "<=" => InfixOp::LessEquals,
            ">=" => InfixOp::GreaterEquals,
            "==" => InfixOp::Equals,
            "!=" => InfixOp::NotEquals,
            "&" => InfixOp::BitAnd,
            "^" => InfixOp::Xor,
            "|" => InfixOp::BitOr,
            "&&" => InfixOp::ConditionalAnd,
            "||" => InfixOp::ConditionalOr,
            _ => return None,
        })
    }

    /// Java binding strength; higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            InfixOp::Times | InfixOp::Divide | InfixOp::Remainder => 12,
            InfixOp::Plus | InfixOp::Minus => 11,
            InfixOp::LeftShift | InfixOp::RightShiftSigned | InfixOp::RightShiftUnsigned => 10,
            InfixOp::Less | InfixOp::Greater | InfixOp::LessEquals | InfixOp::GreaterEquals => 9,
            InfixOp::Equals | InfixOp::NotEquals => 8,
            InfixOp::BitAnd => 7,
            InfixOp::Xor => 6,
            InfixOp::BitOr => 5,
            InfixOp::ConditionalAnd => 4,
            InfixOp::ConditionalOr => 3,
        }
    }

    /// The comparison that holds exactly when `self` does not.
    ///
    /// Only defined where the negation is exact for every operand type. `<` and
    /// friends are excluded because of `NaN`.
    pub fn negated_comparison(self) -> Option<InfixOp> {
        match self {
            InfixOp::Equals => Some(InfixOp::NotEquals),
            InfixOp::NotEquals => Some(InfixOp::Equals),
            _ => None,
        }
    }

    /// `a op (b op c)` reads the same as `(a op b) op c`.
    pub fn is_associative(self) -> bool {
        matches!(
            self,
            InfixOp::ConditionalAnd
                | InfixOp::ConditionalOr
                | InfixOp::BitAnd
                | InfixOp::BitOr
                | InfixOp::Xor
        )
    }
}

impl fmt::Display for InfixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrefixOp {
    Increment,
    Decrement,
    Plus,
    Minus,
    Complement,
    Not,
}

impl PrefixOp {
    pub fn as_str(self) -> &'static str {
        match self {
            PrefixOp::Increment => "++",
            PrefixOp::Decrement => "--",
            PrefixOp::Plus => "+",
            PrefixOp::Minus => "-",
            PrefixOp::Complement => "~",
            PrefixOp::Not => "!",
        }
    }

    pub fn is_update(self) -> bool {
        matches!(self, PrefixOp::Increment | PrefixOp::Decrement)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostfixOp {
    Increment,
    Decrement,
}

impl PostfixOp {
    pub fn as_str(self) -> &'static str {
        match self {
            PostfixOp::Increment => "++",
            PostfixOp::Decrement => "--",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignOp {
    Assign,
    PlusAssign,
    MinusAssign,
    TimesAssign,
    DivideAssign,
    RemainderAssign,
    BitAndAssign,
    BitOrAssign,
    XorAssign,
    LeftShiftAssign,
    RightShiftSignedAssign,
    RightShiftUnsignedAssign,
}

impl AssignOp {
    pub fn as_str(self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::PlusAssign => "+=",
            AssignOp::MinusAssign => "-=",
            AssignOp::TimesAssign => "*=",
            AssignOp::DivideAssign => "/=",
            AssignOp::RemainderAssign => "%=",
            AssignOp::BitAndAssign => "&=",
            AssignOp::BitOrAssign => "|=",
            AssignOp::XorAssign => "^=",
            AssignOp::LeftShiftAssign => "<<=",
            AssignOp::RightShiftSignedAssign => ">>=",
            AssignOp::RightShiftUnsignedAssign => ">>>=",
        }
    }

    pub fn from_token(token: &str) -> Option<AssignOp> {
        Some(match token {
            "=" => AssignOp::Assign,
            "+=" => AssignOp::PlusAssign,
            "-=" => AssignOp::MinusAssign,
            "*=" => AssignOp::TimesAssign,
            "/=" => AssignOp::DivideAssign,
            "%=" => AssignOp::RemainderAssign,
            "&=" => AssignOp::BitAndAssign,
            "|=" => AssignOp::BitOrAssign,
            "^=" => AssignOp::XorAssign,
            "<<=" => AssignOp::LeftShiftAssign,
            ">>=" => AssignOp::RightShiftSignedAssign,
            ">>>=" => AssignOp::RightShiftUnsignedAssign,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    Boolean(bool),
    Null,
    Number,
    Character,
    String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeDeclKind {
    Class,
    Interface,
    Enum,
}

/// Declaration modifiers as a small bit set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Modifiers(u16);

impl Modifiers {
    pub const PUBLIC: Modifiers = Modifiers(1 << 0);
    pub const PROTECTED: Modifiers = Modifiers(1 << 1);
    pub const PRIVATE: Modifiers = Modifiers(1 << 2);
    pub const STATIC: Modifiers = Modifiers(1 << 3);
    pub const FINAL: Modifiers = Modifiers(1 << 4);
    pub const ABSTRACT: Modifiers = Modifiers(1 << 5);
    pub const SYNCHRONIZED: Modifiers = Modifiers(1 << 6);
    pub const NATIVE: Modifiers = Modifiers(1 << 7);
    pub const TRANSIENT: Modifiers = Modifiers(1 << 8);
    pub const VOLATILE: Modifiers = Modifiers(1 << 9);
    pub const DEFAULT: Modifiers = Modifiers(1 << 10);

    pub const fn empty() -> Modifiers {
        Modifiers(0)
    }

    pub fn from_keyword(keyword: &str) -> Option<Modifiers> {
        Some(match keyword {
            "public" => Modifiers::PUBLIC,
            "protected" => Modifiers::PROTECTED,
            "private" => Modifiers::PRIVATE,
            "static" => Modifiers::STATIC,
            "final" => Modifiers::FINAL,
            "abstract" => Modifiers::ABSTRACT,
            "synchronized" => Modifiers::SYNCHRONIZED,
            "native" => Modifiers::NATIVE,
            "transient" => Modifiers::TRANSIENT,
            "volatile" => Modifiers::VOLATILE,
            "default" => Modifiers::DEFAULT,
            _ => return None,
        })
    }

    pub fn contains(self, other: Modifiers) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Modifiers) {
        self.0 |= other.0;
    }

    pub fn is_static(self) -> bool {
        self.contains(Modifiers::STATIC)
    }

    pub fn is_final(self) -> bool {
        self.contains(Modifiers::FINAL)
    }
}
