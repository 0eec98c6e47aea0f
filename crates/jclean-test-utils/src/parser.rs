//! Recursive-descent parser for the Java subset used by cleanup fixtures.
//!
//! Covers classes, interfaces and simple enums with fields, methods and
//! constructors, all statement forms except `switch`/`synchronized`/`assert`,
//! and expressions without lambdas, method references or anonymous classes.
//! Anything outside the subset is reported as [`FrontendError::Unsupported`].

use jclean_ast::{
    AssignOp, Ast, AstBuilder, FrontendError, InfixOp, LiteralKind, Modifiers, NodeId, NodeKind,
    PostfixOp, PrefixOp, TextRange, TextRangeExt, TypeDeclKind,
};

use crate::lexer::{lex, Token, TokenKind, KEYWORDS, PRIMITIVE_TYPES};

type PResult<T> = Result<T, FrontendError>;

/// Supertypes as written in `extends`/`implements` clauses.
#[derive(Debug, Clone)]
pub(crate) struct TypeHeader {
    pub decl: NodeId,
    pub supertypes: Vec<String>,
}

#[derive(Debug)]
pub(crate) struct ParseOutput {
    pub ast: Ast,
    pub headers: Vec<TypeHeader>,
}

pub(crate) fn parse_java(input: &str) -> PResult<ParseOutput> {
    let lexed = lex(input)?;
    let mut parser = Parser {
        input,
        tokens: lexed.tokens,
        pos: 0,
        builder: AstBuilder::new(),
        headers: Vec::new(),
    };
    for (kind, range) in lexed.comments {
        parser.builder.push_comment(kind, range);
    }
    let root = parser.parse_compilation_unit()?;
    Ok(ParseOutput {
        ast: parser.builder.finish(root),
        headers: parser.headers,
    })
}

fn is_keyword(text: &str) -> bool {
    KEYWORDS.contains(&text)
}

fn is_primitive(text: &str) -> bool {
    PRIMITIVE_TYPES.contains(&text)
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    builder: AstBuilder,
    headers: Vec<TypeHeader>,
}

impl<'a> Parser<'a> {
    // --- declarations ---

    fn parse_compilation_unit(&mut self) -> PResult<NodeId> {
        let package = if self.at("package") {
            let start = self.bump().range.start_offset();
            let name = self.parse_qualified_name()?;
            self.expect(";")?;
            Some(self.alloc(NodeKind::PackageDecl { name }, start))
        } else {
            None
        };

        let mut imports = Vec::new();
        while self.at("import") {
            let start = self.bump().range.start_offset();
            let is_static = self.eat("static");
            let name = self.parse_qualified_name()?;
            let on_demand = self.at(".") && self.nth_is(1, "*");
            if on_demand {
                self.bump();
                self.bump();
            }
            self.expect(";")?;
            imports.push(self.alloc(
                NodeKind::ImportDecl {
                    name,
                    is_static,
                    on_demand,
                },
                start,
            ));
        }

        let mut types = Vec::new();
        while self.current().kind != TokenKind::Eof {
            if self.eat(";") {
                continue;
            }
            types.push(self.parse_type_decl()?);
        }

        Ok(self.builder.alloc(
            NodeKind::CompilationUnit {
                package,
                imports,
                types,
            },
            TextRange::from_offsets(0, self.input.len()),
        ))
    }

    fn parse_type_decl(&mut self) -> PResult<NodeId> {
        let start = self.current().range.start_offset();
        let modifiers = self.parse_modifiers()?;
        let kind = if self.eat("class") {
            TypeDeclKind::Class
        } else if self.eat("interface") {
            TypeDeclKind::Interface
        } else if self.eat("enum") {
            TypeDeclKind::Enum
        } else if self.at("@") || self.at("record") {
            return Err(self.unsupported("annotation or record declaration"));
        } else {
            return Err(self.error_here("expected type declaration"));
        };

        let name_tok = self.expect_ident()?;
        let name = self.name_node(name_tok);
        self.skip_type_args()?;

        let mut supertypes = Vec::new();
        while self.at("extends") || self.at("implements") {
            self.bump();
            loop {
                let type_start = self.current().range.start_offset();
                self.skip_type()?;
                supertypes.push(self.input[type_start..self.prev_end()].to_string());
                if !self.eat(",") {
                    break;
                }
            }
        }

        self.expect("{")?;
        if kind == TypeDeclKind::Enum {
            while self.at_ident() {
                self.bump();
                if self.at("(") {
                    self.pos = self.scan_balanced(self.pos, "(", ")");
                }
                if self.at("{") {
                    return Err(self.unsupported("enum constant body"));
                }
                if !self.eat(",") {
                    break;
                }
            }
            if !self.eat(";") && !self.at("}") {
                return Err(self.error_here("expected `;` or `}` after enum constants"));
            }
        }

        let class_name = name_tok.range.slice(self.input).to_string();
        let mut members = Vec::new();
        while !self.at("}") {
            if self.current().kind == TokenKind::Eof {
                return Err(self.error_here("unterminated type body"));
            }
            if self.eat(";") {
                continue;
            }
            members.push(self.parse_member(&class_name)?);
        }
        self.expect("}")?;

        let decl = self.alloc(
            NodeKind::TypeDecl {
                kind,
                modifiers,
                name,
                members,
            },
            start,
        );
        self.headers.push(TypeHeader { decl, supertypes });
        Ok(decl)
    }

    fn parse_member(&mut self, class_name: &str) -> PResult<NodeId> {
        let checkpoint = self.pos;
        let start = self.current().range.start_offset();
        if self.at("{") || (self.at("static") && self.nth_is(1, "{")) {
            return Err(self.unsupported("initializer block"));
        }

        let modifiers = self.parse_modifiers()?;
        if self.at("class") || self.at("interface") || self.at("enum") {
            self.pos = checkpoint;
            return self.parse_type_decl();
        }
        self.skip_type_args()?;

        let is_constructor = self.at_ident()
            && self.current().range.slice(self.input) == class_name
            && self.nth_is(1, "(");
        let return_type = if is_constructor {
            None
        } else {
            Some(self.parse_type()?)
        };

        let name_tok = self.expect_ident()?;
        if !self.at("(") {
            let Some(ty) = return_type else {
                return Err(self.error_here("expected `(`"));
            };
            let fragments = self.parse_fragments(name_tok)?;
            self.expect(";")?;
            return Ok(self.alloc(
                NodeKind::FieldDecl {
                    modifiers,
                    ty,
                    fragments,
                },
                start,
            ));
        }

        let name = self.name_node(name_tok);
        self.expect("(")?;
        let mut params = Vec::new();
        if !self.eat(")") {
            loop {
                params.push(self.parse_param()?);
                if self.eat(",") {
                    continue;
                }
                self.expect(")")?;
                break;
            }
        }
        self.skip_dims();
        if self.eat("throws") {
            loop {
                self.skip_type()?;
                if !self.eat(",") {
                    break;
                }
            }
        }
        let body = if self.at("{") {
            Some(self.parse_block()?)
        } else {
            self.expect(";")?;
            None
        };

        Ok(self.alloc(
            NodeKind::MethodDecl {
                modifiers,
                return_type,
                name,
                params,
                body,
            },
            start,
        ))
    }

    fn parse_param(&mut self) -> PResult<NodeId> {
        let start = self.current().range.start_offset();
        let modifiers = self.parse_modifiers()?;
        let ty = self.parse_type()?;
        let name_tok = self.expect_ident()?;
        let name = self.name_node(name_tok);
        self.skip_dims();
        Ok(self.alloc(
            NodeKind::Param {
                modifiers,
                ty,
                name,
            },
            start,
        ))
    }

    fn parse_modifiers(&mut self) -> PResult<Modifiers> {
        let mut modifiers = Modifiers::empty();
        loop {
            if self.at("@") && !self.nth_is(1, "interface") {
                self.pos = self
                    .scan_annotation(self.pos)
                    .ok_or_else(|| self.error_here("malformed annotation"))?;
                continue;
            }
            let tok = self.current();
            if tok.kind != TokenKind::Ident {
                break;
            }
            match Modifiers::from_keyword(tok.range.slice(self.input)) {
                Some(modifier) => {
                    modifiers.insert(modifier);
                    self.bump();
                }
                None => break,
            }
        }
        Ok(modifiers)
    }

    fn parse_fragments(&mut self, first_name: Token) -> PResult<Vec<NodeId>> {
        let mut fragments = Vec::new();
        let mut name_tok = first_name;
        loop {
            let name = self.name_node(name_tok);
            self.skip_dims();
            let initializer = if self.eat("=") {
                Some(self.parse_var_init()?)
            } else {
                None
            };
            fragments.push(self.alloc(NodeKind::VarFragment { name, initializer }, name_tok.range.start_offset()));
            if !self.eat(",") {
                break;
            }
            name_tok = self.expect_ident()?;
        }
        Ok(fragments)
    }

    fn parse_var_init(&mut self) -> PResult<NodeId> {
        if self.at("{") {
            self.parse_array_init()
        } else {
            self.parse_expr()
        }
    }

    fn parse_array_init(&mut self) -> PResult<NodeId> {
        let start = self.expect("{")?.range.start_offset();
        let mut elements = Vec::new();
        while !self.at("}") {
            elements.push(self.parse_var_init()?);
            if !self.eat(",") {
                break;
            }
        }
        self.expect("}")?;
        Ok(self.alloc(NodeKind::ArrayInit { elements }, start))
    }

    fn parse_type(&mut self) -> PResult<NodeId> {
        let start = self.current().range.start_offset();
        self.skip_type()?;
        let text = self.input[start..self.prev_end()].to_string();
        Ok(self.alloc(NodeKind::TypeRef { text }, start))
    }

    fn parse_qualified_name(&mut self) -> PResult<NodeId> {
        let first = self.expect_ident()?;
        let start = first.range.start_offset();
        let mut node = self.name_node(first);
        while self.at(".") && self.is_ident(self.pos + 1) {
            self.bump();
            let tok = self.bump();
            let name = self.name_node(tok);
            node = self.alloc(
                NodeKind::QualifiedName {
                    qualifier: node,
                    name,
                },
                start,
            );
        }
        Ok(node)
    }

    // --- statements ---

    fn parse_block(&mut self) -> PResult<NodeId> {
        let start = self.expect("{")?.range.start_offset();
        let mut statements = Vec::new();
        while !self.at("}") {
            if self.current().kind == TokenKind::Eof {
                return Err(self.error_here("unterminated block"));
            }
            statements.push(self.parse_block_statement()?);
        }
        self.bump();
        Ok(self.alloc(NodeKind::Block { statements }, start))
    }

    fn parse_block_statement(&mut self) -> PResult<NodeId> {
        if self.at("class") || self.at("interface") || self.at("enum") {
            return Err(self.unsupported("local type declaration"));
        }
        if self.at_local_var_decl() {
            let start = self.current().range.start_offset();
            let modifiers = self.parse_modifiers()?;
            let ty = self.parse_type()?;
            let name_tok = self.expect_ident()?;
            let fragments = self.parse_fragments(name_tok)?;
            self.expect(";")?;
            return Ok(self.alloc(
                NodeKind::LocalVarDecl {
                    modifiers,
                    ty,
                    fragments,
                },
                start,
            ));
        }
        self.parse_statement()
    }

    fn parse_statement(&mut self) -> PResult<NodeId> {
        let tok = self.current();
        let start = tok.range.start_offset();
        let text = tok.range.slice(self.input);
        if tok.kind == TokenKind::Punct {
            match text {
                "{" => return self.parse_block(),
                ";" => {
                    self.bump();
                    return Ok(self.alloc(NodeKind::Empty, start));
                }
                _ => {}
            }
        }
        if tok.kind == TokenKind::Ident {
            match text {
                "if" => {
                    self.bump();
                    let condition = self.parse_paren_condition()?;
                    let then_branch = self.parse_statement()?;
                    let else_branch = if self.eat("else") {
                        Some(self.parse_statement()?)
                    } else {
                        None
                    };
                    return Ok(self.alloc(
                        NodeKind::If {
                            condition,
                            then_branch,
                            else_branch,
                        },
                        start,
                    ));
                }
                "while" => {
                    self.bump();
                    let condition = self.parse_paren_condition()?;
                    let body = self.parse_statement()?;
                    return Ok(self.alloc(NodeKind::While { condition, body }, start));
                }
                "do" => {
                    self.bump();
                    let body = self.parse_statement()?;
                    self.expect("while")?;
                    let condition = self.parse_paren_condition()?;
                    self.expect(";")?;
                    return Ok(self.alloc(NodeKind::Do { body, condition }, start));
                }
                "for" => return self.parse_for(),
                "try" => return self.parse_try(),
                "return" => {
                    self.bump();
                    let expr = if self.at(";") {
                        None
                    } else {
                        Some(self.parse_expr()?)
                    };
                    self.expect(";")?;
                    return Ok(self.alloc(NodeKind::Return { expr }, start));
                }
                "throw" => {
                    self.bump();
                    let expr = self.parse_expr()?;
                    self.expect(";")?;
                    return Ok(self.alloc(NodeKind::Throw { expr }, start));
                }
                "break" | "continue" => {
                    self.bump();
                    let label = if self.at_ident() {
                        Some(self.bump().range.slice(self.input).to_string())
                    } else {
                        None
                    };
                    self.expect(";")?;
                    let kind = if text == "break" {
                        NodeKind::Break { label }
                    } else {
                        NodeKind::Continue { label }
                    };
                    return Ok(self.alloc(kind, start));
                }
                "switch" | "synchronized" | "assert" | "yield" => {
                    return Err(self.unsupported(&format!("`{text}` statement")));
                }
                _ => {}
            }
            if self.at_ident() && self.nth_is(1, ":") {
                let label = self.bump().range.slice(self.input).to_string();
                self.bump();
                let body = self.parse_statement()?;
                return Ok(self.alloc(NodeKind::Labeled { label, body }, start));
            }
        }

        let expr = self.parse_expr()?;
        self.expect(";")?;
        Ok(self.alloc(NodeKind::ExprStmt { expr }, start))
    }

    fn parse_paren_condition(&mut self) -> PResult<NodeId> {
        self.expect("(")?;
        let condition = self.parse_expr()?;
        self.expect(")")?;
        Ok(condition)
    }

    fn parse_for(&mut self) -> PResult<NodeId> {
        let start = self.bump().range.start_offset();
        self.expect("(")?;

        let mut init = Vec::new();
        if self.at_local_var_decl() {
            let decl_start = self.current().range.start_offset();
            let modifiers = self.parse_modifiers()?;
            let ty = self.parse_type()?;
            let name_tok = self.expect_ident()?;
            if self.eat(":") {
                let name = self.name_node(name_tok);
                let param = self.builder.alloc(
                    NodeKind::Param {
                        modifiers,
                        ty,
                        name,
                    },
                    TextRange::from_offsets(decl_start, name_tok.range.end_offset()),
                );
                let iterable = self.parse_expr()?;
                self.expect(")")?;
                let body = self.parse_statement()?;
                return Ok(self.alloc(
                    NodeKind::ForEach {
                        param,
                        iterable,
                        body,
                    },
                    start,
                ));
            }
            let fragments = self.parse_fragments(name_tok)?;
            init.push(self.alloc(
                NodeKind::VarDeclExpr {
                    modifiers,
                    ty,
                    fragments,
                },
                decl_start,
            ));
        } else if !self.at(";") {
            loop {
                init.push(self.parse_expr()?);
                if !self.eat(",") {
                    break;
                }
            }
        }
        self.expect(";")?;

        let condition = if self.at(";") {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(";")?;

        let mut updaters = Vec::new();
        if !self.at(")") {
            loop {
                updaters.push(self.parse_expr()?);
                if !self.eat(",") {
                    break;
                }
            }
        }
        self.expect(")")?;
        let body = self.parse_statement()?;
        Ok(self.alloc(
            NodeKind::For {
                init,
                condition,
                updaters,
                body,
            },
            start,
        ))
    }

    fn parse_try(&mut self) -> PResult<NodeId> {
        let start = self.bump().range.start_offset();
        let mut resources = Vec::new();
        if self.eat("(") {
            while !self.at(")") {
                if self.at_local_var_decl() {
                    let decl_start = self.current().range.start_offset();
                    let modifiers = self.parse_modifiers()?;
                    let ty = self.parse_type()?;
                    let name_tok = self.expect_ident()?;
                    let fragments = self.parse_fragments(name_tok)?;
                    resources.push(self.alloc(
                        NodeKind::VarDeclExpr {
                            modifiers,
                            ty,
                            fragments,
                        },
                        decl_start,
                    ));
                } else {
                    resources.push(self.parse_expr()?);
                }
                if !self.eat(";") {
                    break;
                }
            }
            self.expect(")")?;
        }

        let body = self.parse_block()?;
        let mut catches = Vec::new();
        while self.at("catch") {
            let catch_start = self.bump().range.start_offset();
            self.expect("(")?;
            let param_start = self.current().range.start_offset();
            let modifiers = self.parse_modifiers()?;
            let type_start = self.current().range.start_offset();
            loop {
                self.skip_type()?;
                if !self.eat("|") {
                    break;
                }
            }
            let ty = self.alloc(
                NodeKind::TypeRef {
                    text: self.input[type_start..self.prev_end()].to_string(),
                },
                type_start,
            );
            let name_tok = self.expect_ident()?;
            let name = self.name_node(name_tok);
            let param = self.alloc(
                NodeKind::Param {
                    modifiers,
                    ty,
                    name,
                },
                param_start,
            );
            self.expect(")")?;
            let catch_body = self.parse_block()?;
            catches.push(self.alloc(
                NodeKind::Catch {
                    param,
                    body: catch_body,
                },
                catch_start,
            ));
        }
        let finally = if self.eat("finally") {
            Some(self.parse_block()?)
        } else {
            None
        };
        if resources.is_empty() && catches.is_empty() && finally.is_none() {
            return Err(self.error_here("`try` without `catch` or `finally`"));
        }

        Ok(self.alloc(
            NodeKind::Try {
                resources,
                body,
                catches,
                finally,
            },
            start,
        ))
    }

    // --- expressions ---

    fn parse_expr(&mut self) -> PResult<NodeId> {
        let lhs = self.parse_conditional()?;
        let tok = self.current();
        if tok.kind == TokenKind::Punct {
            if let Some(op) = AssignOp::from_token(tok.range.slice(self.input)) {
                self.bump();
                let rhs = self.parse_expr()?;
                let start = self.builder.range(lhs).start_offset();
                return Ok(self.alloc(NodeKind::Assign { op, lhs, rhs }, start));
            }
        }
        Ok(lhs)
    }

    fn parse_conditional(&mut self) -> PResult<NodeId> {
        let condition = self.parse_binary(0)?;
        if !self.eat("?") {
            return Ok(condition);
        }
        let then_expr = self.parse_expr()?;
        self.expect(":")?;
        let else_expr = self.parse_conditional()?;
        let start = self.builder.range(condition).start_offset();
        Ok(self.alloc(
            NodeKind::Conditional {
                condition,
                then_expr,
                else_expr,
            },
            start,
        ))
    }

    /// Precedence climbing; runs of the same operator collect into one
    /// extended-operand infix node.
    fn parse_binary(&mut self, min_prec: u8) -> PResult<NodeId> {
        const INSTANCEOF_PREC: u8 = 9;

        let mut left = self.parse_unary()?;
        let mut pending: Option<(InfixOp, Vec<NodeId>)> = None;
        loop {
            if self.at("instanceof") {
                if INSTANCEOF_PREC < min_prec {
                    break;
                }
                left = self.flush_infix(pending.take(), left);
                self.bump();
                self.eat("final");
                let ty = self.parse_type()?;
                if self.at_ident() {
                    return Err(self.unsupported("instanceof pattern"));
                }
                let start = self.builder.range(left).start_offset();
                left = self.alloc(NodeKind::InstanceOf { expr: left, ty }, start);
                continue;
            }

            let tok = self.current();
            if tok.kind != TokenKind::Punct {
                break;
            }
            let Some(op) = InfixOp::from_token(tok.range.slice(self.input)) else {
                break;
            };
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            self.bump();
            let right = self.parse_binary(prec + 1)?;
            if let Some((pending_op, operands)) = pending.as_mut() {
                if *pending_op == op {
                    operands.push(right);
                    continue;
                }
            }
            left = self.flush_infix(pending.take(), left);
            pending = Some((op, vec![left, right]));
        }
        Ok(self.flush_infix(pending, left))
    }

    fn flush_infix(&mut self, pending: Option<(InfixOp, Vec<NodeId>)>, left: NodeId) -> NodeId {
        match pending {
            None => left,
            Some((op, operands)) => {
                let start = self.builder.range(operands[0]).start_offset();
                let end = self.builder.range(operands[operands.len() - 1]).end_offset();
                self.builder
                    .alloc(NodeKind::Infix { op, operands }, TextRange::from_offsets(start, end))
            }
        }
    }

    fn parse_unary(&mut self) -> PResult<NodeId> {
        let tok = self.current();
        let start = tok.range.start_offset();
        if tok.kind == TokenKind::Punct {
            let op = match tok.range.slice(self.input) {
                "++" => Some(PrefixOp::Increment),
                "--" => Some(PrefixOp::Decrement),
                "+" => Some(PrefixOp::Plus),
                "-" => Some(PrefixOp::Minus),
                "~" => Some(PrefixOp::Complement),
                "!" => Some(PrefixOp::Not),
                _ => None,
            };
            if let Some(op) = op {
                self.bump();
                let operand = self.parse_unary()?;
                return Ok(self.alloc(NodeKind::Prefix { op, operand }, start));
            }
            if self.at("(") && self.is_lambda_paren() {
                return Err(self.unsupported("lambda expression"));
            }
            if self.at("(") && self.is_cast() {
                self.bump();
                let ty = self.parse_type()?;
                self.expect(")")?;
                let expr = self.parse_unary()?;
                return Ok(self.alloc(NodeKind::Cast { ty, expr }, start));
            }
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> PResult<NodeId> {
        let mut expr = self.parse_primary()?;
        let start = self.builder.range(expr).start_offset();
        loop {
            if self.at(".") {
                let next = self.nth(1);
                let next_text = next.range.slice(self.input);
                if matches!(next_text, "<" | "new" | "this" | "class" | "super") {
                    return Err(self.unsupported(&format!("`.{next_text}` selector")));
                }
                self.bump();
                let name_tok = self.expect_ident()?;
                let name = self.name_node(name_tok);
                expr = if self.at("(") {
                    let args = self.parse_args()?;
                    self.alloc(
                        NodeKind::MethodCall {
                            receiver: Some(expr),
                            name,
                            args,
                        },
                        start,
                    )
                } else if matches!(
                    self.builder.kind(expr),
                    NodeKind::SimpleName { .. } | NodeKind::QualifiedName { .. }
                ) {
                    self.alloc(
                        NodeKind::QualifiedName {
                            qualifier: expr,
                            name,
                        },
                        start,
                    )
                } else {
                    self.alloc(NodeKind::FieldAccess { target: expr, name }, start)
                };
            } else if self.at("[") {
                self.bump();
                let index = self.parse_expr()?;
                self.expect("]")?;
                expr = self.alloc(NodeKind::ArrayAccess { array: expr, index }, start);
            } else if self.at("++") || self.at("--") {
                let op = if self.bump().range.slice(self.input) == "++" {
                    PostfixOp::Increment
                } else {
                    PostfixOp::Decrement
                };
                expr = self.alloc(NodeKind::Postfix { op, operand: expr }, start);
            } else if self.at("::") {
                return Err(self.unsupported("method reference"));
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_primary(&mut self) -> PResult<NodeId> {
        let tok = self.current();
        let start = tok.range.start_offset();
        let text = tok.range.slice(self.input);
        let literal = match tok.kind {
            TokenKind::IntLiteral
            | TokenKind::LongLiteral
            | TokenKind::FloatLiteral
            | TokenKind::DoubleLiteral => Some(LiteralKind::Number),
            TokenKind::CharLiteral => Some(LiteralKind::Character),
            TokenKind::StringLiteral => Some(LiteralKind::String),
            TokenKind::Ident => match text {
                "true" => Some(LiteralKind::Boolean(true)),
                "false" => Some(LiteralKind::Boolean(false)),
                "null" => Some(LiteralKind::Null),
                _ => None,
            },
            _ => None,
        };
        if let Some(kind) = literal {
            self.bump();
            return Ok(self.alloc(
                NodeKind::Literal {
                    kind,
                    text: text.to_string(),
                },
                start,
            ));
        }

        match (tok.kind, text) {
            (TokenKind::Punct, "(") => {
                self.bump();
                let expr = self.parse_expr()?;
                self.expect(")")?;
                Ok(self.alloc(NodeKind::Paren { expr }, start))
            }
            (TokenKind::Ident, "this") => {
                self.bump();
                if self.at("(") {
                    return Err(self.unsupported("explicit constructor invocation"));
                }
                Ok(self.alloc(NodeKind::This { qualifier: None }, start))
            }
            (TokenKind::Ident, "super") => {
                self.bump();
                if self.at("(") {
                    return Err(self.unsupported("explicit constructor invocation"));
                }
                self.expect(".")?;
                let name_tok = self.expect_ident()?;
                let name = self.name_node(name_tok);
                if self.at("(") {
                    let args = self.parse_args()?;
                    Ok(self.alloc(
                        NodeKind::SuperMethodCall {
                            qualifier: None,
                            name,
                            args,
                        },
                        start,
                    ))
                } else {
                    Ok(self.alloc(
                        NodeKind::SuperFieldAccess {
                            qualifier: None,
                            name,
                        },
                        start,
                    ))
                }
            }
            (TokenKind::Ident, "new") => self.parse_new(),
            (TokenKind::Ident, "switch") => Err(self.unsupported("switch expression")),
            (TokenKind::Ident, _) if !is_keyword(text) => {
                if self.nth_is(1, "->") {
                    return Err(self.unsupported("lambda expression"));
                }
                self.bump();
                let name = self.name_node(tok);
                if self.at("(") {
                    let args = self.parse_args()?;
                    return Ok(self.alloc(
                        NodeKind::MethodCall {
                            receiver: None,
                            name,
                            args,
                        },
                        start,
                    ));
                }
                Ok(name)
            }
            _ => Err(self.error_here("expected expression")),
        }
    }

    fn parse_new(&mut self) -> PResult<NodeId> {
        let start = self.bump().range.start_offset();
        if self.at("<") {
            return Err(self.unsupported("constructor type arguments"));
        }
        let type_start = self.current().range.start_offset();
        let first = self.bump();
        let first_text = first.range.slice(self.input);
        if first.kind != TokenKind::Ident || (is_keyword(first_text) && !is_primitive(first_text)) {
            return Err(self.error_here("expected type after `new`"));
        }
        if !is_primitive(first_text) {
            self.skip_type_args()?;
            while self.at(".") && self.is_ident(self.pos + 1) {
                self.bump();
                self.bump();
                self.skip_type_args()?;
            }
        }
        let ty = self.alloc(
            NodeKind::TypeRef {
                text: self.input[type_start..self.prev_end()].to_string(),
            },
            type_start,
        );

        if self.at("[") {
            let mut dimensions = Vec::new();
            let mut empty_dims = 0usize;
            while self.at("[") {
                self.bump();
                if self.eat("]") {
                    empty_dims += 1;
                    continue;
                }
                if empty_dims > 0 {
                    return Err(self.error_here("array dimension after `[]`"));
                }
                dimensions.push(self.parse_expr()?);
                self.expect("]")?;
            }
            let initializer = if self.at("{") {
                Some(self.parse_array_init()?)
            } else {
                None
            };
            if dimensions.is_empty() == initializer.is_none() {
                return Err(self.error_here("array creation needs dimensions or an initializer"));
            }
            return Ok(self.alloc(
                NodeKind::ArrayCreation {
                    ty,
                    dimensions,
                    initializer,
                },
                start,
            ));
        }

        let args = self.parse_args()?;
        if self.at("{") {
            return Err(self.unsupported("anonymous class"));
        }
        Ok(self.alloc(
            NodeKind::New {
                outer: None,
                ty,
                args,
            },
            start,
        ))
    }

    fn parse_args(&mut self) -> PResult<Vec<NodeId>> {
        self.expect("(")?;
        let mut args = Vec::new();
        if self.eat(")") {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            if self.eat(",") {
                continue;
            }
            self.expect(")")?;
            return Ok(args);
        }
    }

    // --- lookahead ---

    fn at_local_var_decl(&self) -> bool {
        let mut i = self.pos;
        loop {
            if self.tok_is(i, "final") {
                i += 1;
            } else if self.tok_is(i, "@") {
                match self.scan_annotation(i) {
                    Some(next) => i = next,
                    None => return false,
                }
            } else {
                break;
            }
        }
        if self.tok_is(i, "void") {
            return false;
        }
        let Some(after) = self.scan_type(i) else {
            return false;
        };
        self.is_ident(after)
            && ["=", ";", ",", "[", ":"]
                .iter()
                .any(|follow| self.tok_is(after + 1, follow))
    }

    fn is_cast(&self) -> bool {
        let Some(after) = self.scan_type(self.pos + 1) else {
            return false;
        };
        if !self.tok_is(after, ")") {
            return false;
        }
        if is_primitive(self.tok(self.pos + 1).range.slice(self.input)) {
            return true;
        }
        let next = self.tok(after + 1);
        let text = next.range.slice(self.input);
        match next.kind {
            TokenKind::Ident => {
                !is_keyword(text) || matches!(text, "this" | "new" | "super" | "true" | "false" | "null")
            }
            TokenKind::Punct => matches!(text, "(" | "!" | "~"),
            TokenKind::Eof => false,
            _ => true,
        }
    }

    fn is_lambda_paren(&self) -> bool {
        let after = self.scan_balanced(self.pos, "(", ")");
        self.tok_is(after, "->")
    }

    /// Index after a type starting at `i`, if one is there.
    fn scan_type(&self, mut i: usize) -> Option<usize> {
        let tok = self.tok(i);
        if tok.kind != TokenKind::Ident {
            return None;
        }
        let text = tok.range.slice(self.input);
        if is_primitive(text) || text == "void" {
            i += 1;
        } else if is_keyword(text) {
            return None;
        } else {
            i = self.scan_type_args(i + 1)?;
            while self.tok_is(i, ".") && self.is_ident(i + 1) {
                i = self.scan_type_args(i + 2)?;
            }
        }
        while self.tok_is(i, "[") && self.tok_is(i + 1, "]") {
            i += 2;
        }
        if self.tok_is(i, "...") {
            i += 1;
        }
        Some(i)
    }

    fn scan_type_args(&self, mut i: usize) -> Option<usize> {
        if !self.tok_is(i, "<") {
            return Some(i);
        }
        let mut depth = 0i32;
        loop {
            let tok = self.tok(i);
            match (tok.kind, tok.range.slice(self.input)) {
                (TokenKind::Punct, "<") => depth += 1,
                (TokenKind::Punct, ">") => depth -= 1,
                (TokenKind::Punct, ">>") => depth -= 2,
                (TokenKind::Punct, ">>>") => depth -= 3,
                (TokenKind::Punct, "?" | "," | "." | "&" | "[" | "]") => {}
                (TokenKind::Ident, text) if !is_keyword(text) || is_primitive(text) => {}
                (TokenKind::Ident, "extends" | "super") => {}
                _ => return None,
            }
            i += 1;
            if depth <= 0 {
                return Some(i);
            }
        }
    }

    fn scan_annotation(&self, i: usize) -> Option<usize> {
        if !self.tok_is(i, "@") || !self.is_ident(i + 1) {
            return None;
        }
        let mut i = i + 2;
        while self.tok_is(i, ".") && self.is_ident(i + 1) {
            i += 2;
        }
        if self.tok_is(i, "(") {
            i = self.scan_balanced(i, "(", ")");
        }
        Some(i)
    }

    fn scan_balanced(&self, mut i: usize, open: &str, close: &str) -> usize {
        let mut depth = 0usize;
        loop {
            let tok = self.tok(i);
            if tok.kind == TokenKind::Eof {
                return i;
            }
            if self.tok_is(i, open) {
                depth += 1;
            } else if self.tok_is(i, close) {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return i + 1;
                }
            }
            i += 1;
        }
    }

    fn skip_type(&mut self) -> PResult<()> {
        self.pos = self
            .scan_type(self.pos)
            .ok_or_else(|| self.error_here("expected type"))?;
        Ok(())
    }

    fn skip_type_args(&mut self) -> PResult<()> {
        self.pos = self
            .scan_type_args(self.pos)
            .ok_or_else(|| self.error_here("malformed type arguments"))?;
        Ok(())
    }

    fn skip_dims(&mut self) {
        while self.at("[") && self.nth_is(1, "]") {
            self.bump();
            self.bump();
        }
    }

    // --- token cursor ---

    fn tok(&self, i: usize) -> Token {
        self.tokens[i.min(self.tokens.len() - 1)]
    }

    fn tok_is(&self, i: usize, text: &str) -> bool {
        let tok = self.tok(i);
        matches!(tok.kind, TokenKind::Punct | TokenKind::Ident) && tok.range.slice(self.input) == text
    }

    fn is_ident(&self, i: usize) -> bool {
        let tok = self.tok(i);
        tok.kind == TokenKind::Ident && !is_keyword(tok.range.slice(self.input))
    }

    fn current(&self) -> Token {
        self.tok(self.pos)
    }

    fn nth(&self, n: usize) -> Token {
        self.tok(self.pos + n)
    }

    fn at(&self, text: &str) -> bool {
        self.tok_is(self.pos, text)
    }

    fn nth_is(&self, n: usize, text: &str) -> bool {
        self.tok_is(self.pos + n, text)
    }

    fn at_ident(&self) -> bool {
        self.is_ident(self.pos)
    }

    fn bump(&mut self) -> Token {
        let tok = self.current();
        if tok.kind != TokenKind::Eof {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, text: &str) -> bool {
        if self.at(text) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, text: &str) -> PResult<Token> {
        if self.at(text) {
            Ok(self.bump())
        } else {
            Err(self.error_here(&format!("expected `{text}`")))
        }
    }

    fn expect_ident(&mut self) -> PResult<Token> {
        if self.at_ident() {
            Ok(self.bump())
        } else {
            Err(self.error_here("expected identifier"))
        }
    }

    fn prev_end(&self) -> usize {
        match self.pos.checked_sub(1) {
            Some(prev) => self.tokens[prev].range.end_offset(),
            None => 0,
        }
    }

    fn error_here(&self, message: &str) -> FrontendError {
        FrontendError::Syntax {
            offset: self.current().range.start_offset(),
            message: message.to_string(),
        }
    }

    fn unsupported(&self, what: &str) -> FrontendError {
        FrontendError::Unsupported {
            offset: self.current().range.start_offset(),
            what: what.to_string(),
        }
    }

    // --- node allocation ---

    /// Allocates a node spanning `start` to the end of the last consumed token.
    fn alloc(&mut self, kind: NodeKind, start: usize) -> NodeId {
        let end = self.prev_end();
        self.builder.alloc(kind, TextRange::from_offsets(start, end))
    }

    fn name_node(&mut self, tok: Token) -> NodeId {
        self.builder.alloc(
            NodeKind::SimpleName {
                ident: tok.range.slice(self.input).to_string(),
            },
            tok.range,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(input: &str) -> Ast {
        parse_java(input).expect("fixture should parse").ast
    }

    fn find(ast: &Ast, pred: impl Fn(&NodeKind) -> bool) -> NodeId {
        ast.preorder(ast.root())
            .into_iter()
            .find(|id| pred(ast.kind(*id)))
            .expect("node present")
    }

    #[test]
    fn extended_operands_collect_same_operator_runs() {
        let input = "class A { boolean f(boolean a, boolean b, boolean c) { return a && b && c || !a; } }";
        let ast = parse(input);
        let or = find(&ast, |k| matches!(k, NodeKind::Infix { op: InfixOp::ConditionalOr, .. }));
        let and = find(&ast, |k| matches!(k, NodeKind::Infix { op: InfixOp::ConditionalAnd, .. }));
        assert_eq!(ast.text(or, input), "a && b && c || !a");
        assert_eq!(ast.text(and, input), "a && b && c");
        assert_eq!(ast.children(and).len(), 3);
    }

    #[test]
    fn statement_ranges_include_terminators() {
        let input = "class A {\n  void f(int[] xs) {\n    int i = 0, j;\n    if (i == 0) i++; else { j = (int) xs[0]; }\n  }\n}\n";
        let ast = parse(input);
        let decl = find(&ast, |k| matches!(k, NodeKind::LocalVarDecl { .. }));
        assert_eq!(ast.text(decl, input), "int i = 0, j;");
        let stmt = find(&ast, |k| matches!(k, NodeKind::If { .. }));
        assert_eq!(
            ast.text(stmt, input),
            "if (i == 0) i++; else { j = (int) xs[0]; }"
        );
        let cast = find(&ast, |k| matches!(k, NodeKind::Cast { .. }));
        assert_eq!(ast.text(cast, input), "(int) xs[0]");
    }

    #[test]
    fn generic_declarations_and_qualified_names() {
        let input = "import java.util.*;\nclass A<T> extends B implements C<T> {\n  Map<String, List<T>> m = new HashMap<>();\n  void f() { for (String s : m.keySet()) { System.out.println(s); } }\n}\n";
        let out = parse_java(input).expect("parse");
        assert_eq!(out.headers[0].supertypes, vec!["B", "C<T>"]);
        let ast = out.ast;
        let field = find(&ast, |k| matches!(k, NodeKind::FieldDecl { .. }));
        let NodeKind::FieldDecl { ty, .. } = ast.kind(field) else {
            unreachable!()
        };
        assert_eq!(
            ast.kind(*ty),
            &NodeKind::TypeRef {
                text: "Map<String, List<T>>".into()
            }
        );
        let qualified: Vec<_> = ast
            .preorder(ast.root())
            .into_iter()
            .filter(|id| matches!(ast.kind(*id), NodeKind::QualifiedName { .. }))
            .map(|id| ast.text(id, input))
            .collect();
        assert_eq!(qualified, vec!["java.util", "System.out"]);
        assert!(matches!(
            ast.kind(find(&ast, |k| matches!(k, NodeKind::ForEach { .. }))),
            NodeKind::ForEach { .. }
        ));
    }

    #[test]
    fn rejects_constructs_outside_the_subset() {
        let err = parse_java("class A { void f() { Runnable r = () -> {}; } }").unwrap_err();
        assert!(matches!(err, FrontendError::Unsupported { .. }), "{err:?}");
        let err = parse_java("class A { void f() { switch (1) {} } }").unwrap_err();
        assert!(matches!(err, FrontendError::Unsupported { .. }), "{err:?}");
    }
}
